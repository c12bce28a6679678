/// Status content validation and plain-text formatting
use super::StatusProcessor;
use crate::config::ServerConfig;
use crate::error::{CourierError, CourierResult};
use crate::model::{Account, MediaAttachment, PollRequest};

/// Check request fields against the configured limits
///
/// Runs before anything is written.
pub(crate) fn validate_status_content(
    config: &ServerConfig,
    text: &str,
    spoiler: &str,
    media_ids: &[String],
    poll: Option<&PollRequest>,
) -> CourierResult<()> {
    let total_chars = text.chars().count() + spoiler.chars().count();

    if total_chars == 0 && media_ids.is_empty() && poll.is_none() {
        return Err(CourierError::Validation(
            "status contains no text, media or poll".to_string(),
        ));
    }

    let max = config.statuses.max_chars;
    if total_chars > max {
        return Err(CourierError::Validation(format!(
            "text with spoiler exceed max chars ({})",
            max
        )));
    }

    let max = config.statuses.max_media_files;
    if media_ids.len() > max {
        return Err(CourierError::Validation(format!(
            "media files exceed max count ({})",
            max
        )));
    }

    if let Some(poll) = poll {
        let max = config.polls.max_options;
        if poll.options.is_empty() {
            return Err(CourierError::Validation(
                "poll cannot have no options".to_string(),
            ));
        }
        if poll.options.len() > max {
            return Err(CourierError::Validation(format!(
                "poll options exceed max count ({})",
                max
            )));
        }

        let max = config.polls.option_max_chars;
        for (i, option) in poll.options.iter().enumerate() {
            match option.chars().count() {
                0 => {
                    return Err(CourierError::Validation(
                        "poll option cannot be empty".to_string(),
                    ))
                }
                n if n > max => {
                    return Err(CourierError::Validation(format!(
                        "poll option {} exceed max chars ({})",
                        i, max
                    )))
                }
                _ => {}
            }
        }

        if poll.expires_in < 0 {
            return Err(CourierError::Validation(
                "poll expiry cannot be negative".to_string(),
            ));
        }
    }

    Ok(())
}

/// Normalize a BCP 47 style language tag (`en`, `pt-BR`, `zh-Hant`)
pub(crate) fn validate_language(tag: &str) -> CourierResult<String> {
    let invalid = || CourierError::Validation(format!("invalid language tag: {}", tag));

    let mut parts = tag.trim().split(['-', '_']);
    let primary = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
    if !(2..=8).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    let mut normalized = primary.to_ascii_lowercase();
    for part in parts {
        if !(1..=8).contains(&part.len()) || !part.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        normalized.push('-');
        match part.len() {
            // Region
            2 if part.chars().all(|c| c.is_ascii_alphabetic()) => {
                normalized.push_str(&part.to_ascii_uppercase())
            }
            // Script
            4 if part.chars().all(|c| c.is_ascii_alphabetic()) => {
                let mut chars = part.chars();
                if let Some(first) = chars.next() {
                    normalized.push(first.to_ascii_uppercase());
                    normalized.push_str(&chars.as_str().to_ascii_lowercase());
                }
            }
            _ => normalized.push_str(&part.to_ascii_lowercase()),
        }
    }

    Ok(normalized)
}

/// Output of formatting one piece of user text
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FormatResult {
    pub html: String,
    /// `(username, domain)` pairs in order of appearance
    pub mentions: Vec<(String, Option<String>)>,
    pub tags: Vec<String>,
    pub emojis: Vec<String>,
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Collect mentions, hashtags and emoji shortcodes from `text`
fn scan(text: &str, result: &mut FormatResult) {
    for word in text.split_whitespace() {
        let trimmed = word.trim_end_matches(|c: char| !is_name_char(c));

        if let Some(rest) = trimmed.strip_prefix('@') {
            let mut pieces = rest.splitn(2, '@');
            let username = pieces.next().unwrap_or_default();
            let domain = pieces.next().filter(|d| !d.is_empty());
            if !username.is_empty() && username.chars().all(is_name_char) {
                let mention = (username.to_string(), domain.map(|d| d.to_ascii_lowercase()));
                if !result.mentions.contains(&mention) {
                    result.mentions.push(mention);
                }
            }
        } else if let Some(tag) = trimmed.strip_prefix('#') {
            if !tag.is_empty() && tag.chars().all(is_name_char) {
                push_unique(&mut result.tags, tag.to_lowercase());
            }
        }

        // Shortcodes may sit anywhere inside a word, e.g. "nice:blobcat:"
        let mut rest = word;
        while let Some(start) = rest.find(':') {
            let after = &rest[start + 1..];
            match after.find(':') {
                Some(end) => {
                    let code = &after[..end];
                    if !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        push_unique(&mut result.emojis, code.to_string());
                        rest = &after[end + 1..];
                    } else {
                        rest = after;
                    }
                }
                None => break,
            }
        }
    }
}

/// Format plain text as paragraphs of escaped HTML
pub(crate) fn format_plain(text: &str) -> FormatResult {
    let mut result = FormatResult::default();
    scan(text, &mut result);

    let normalized = text.replace("\r\n", "\n");
    result.html = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let lines: Vec<String> = p.lines().map(escape_html).collect();
            format!("<p>{}</p>", lines.join("<br />"))
        })
        .collect();

    result
}

/// Format a single line (content warnings, poll options) without wrapping
pub(crate) fn format_plain_basic(text: &str) -> FormatResult {
    let mut result = FormatResult::default();
    scan(text, &mut result);
    result.html = escape_html(text.trim());
    result
}

/// Content fields derived from a create or edit request
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StatusContent {
    pub content: String,
    pub content_warning: String,
    pub language: String,
    pub mention_ids: Vec<String>,
    pub tags: Vec<String>,
    pub emojis: Vec<String>,
}

impl StatusProcessor {
    /// Format text, warning and poll options and resolve the language
    ///
    /// Poll options in `poll` are replaced by their formatted form so later
    /// comparisons against stored options line up.
    pub(crate) async fn process_content(
        &self,
        author: &Account,
        text: &str,
        content_warning: &str,
        language: &str,
        poll: Option<&mut PollRequest>,
    ) -> CourierResult<StatusContent> {
        let language = if !language.is_empty() {
            language.to_string()
        } else {
            author
                .language
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| self.ctx.config.statuses.default_language.clone())
        };
        let language = validate_language(&language)?;

        let body = format_plain(text);
        let warning = format_plain_basic(content_warning);

        let mut emojis = body.emojis.clone();
        for emoji in warning.emojis {
            push_unique(&mut emojis, emoji);
        }

        if let Some(poll) = poll {
            let mut options = Vec::with_capacity(poll.options.len());
            for option in &poll.options {
                let formatted = format_plain_basic(option);
                for emoji in formatted.emojis {
                    push_unique(&mut emojis, emoji);
                }
                options.push(formatted.html);
            }
            poll.options = options;
        }

        let mut mention_ids = Vec::new();
        for (username, domain) in &body.mentions {
            let domain = domain
                .as_deref()
                .filter(|d| *d != self.ctx.config.instance.host.as_str());
            match self.ctx.db.get_account_by_username(username, domain).await? {
                Some(account) => push_unique(&mut mention_ids, account.id),
                None => tracing::debug!(username, domain, "Mentioned account not known, skipping"),
            }
        }

        Ok(StatusContent {
            content: body.html,
            content_warning: warning.html,
            language,
            mention_ids,
            tags: body.tags,
            emojis,
        })
    }

    /// Load the requested attachments
    ///
    /// Each must belong to `author_id` and not be attached to anything but
    /// `status_id` (the status being edited, or the draft being published).
    pub(crate) async fn process_media(
        &self,
        author_id: &str,
        status_id: &str,
        media_ids: &[String],
    ) -> CourierResult<Vec<MediaAttachment>> {
        let min_chars = self.ctx.config.statuses.media_description_min_chars;
        let max_chars = self.ctx.config.statuses.media_description_max_chars;

        let mut attachments = Vec::with_capacity(media_ids.len());
        for id in media_ids {
            let media = match self.ctx.db.get_media(id).await? {
                Some(media) if media.account_id == author_id => media,
                _ => return Err(CourierError::Validation(format!("media not found: {}", id))),
            };

            let attached_elsewhere = media.status_id.as_deref().is_some_and(|s| s != status_id)
                || media
                    .scheduled_status_id
                    .as_deref()
                    .is_some_and(|s| s != status_id);
            if attached_elsewhere {
                return Err(CourierError::Validation(format!(
                    "media already attached to status: {}",
                    id
                )));
            }

            let chars = media.description.chars().count();
            if chars < min_chars {
                return Err(CourierError::Validation(format!(
                    "media description less than min chars ({})",
                    min_chars
                )));
            }
            if chars > max_chars {
                return Err(CourierError::Validation(format!(
                    "media description exceeds max chars ({})",
                    max_chars
                )));
            }

            attachments.push(media);
        }

        Ok(attachments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_limits() {
        let config = ServerConfig::default();
        assert!(validate_status_content(&config, "", "", &[], None).is_err());
        assert!(validate_status_content(&config, "hi", "", &[], None).is_ok());
        assert!(validate_status_content(&config, "", "", &["m".to_string()], None).is_ok());

        let long = "x".repeat(config.statuses.max_chars + 1);
        assert!(validate_status_content(&config, &long, "", &[], None).is_err());

        let poll = PollRequest {
            options: vec!["a".into(), "".into()],
            ..Default::default()
        };
        assert!(validate_status_content(&config, "q", "", &[], Some(&poll)).is_err());

        let poll = PollRequest {
            options: (0..=config.polls.max_options).map(|i| i.to_string()).collect(),
            ..Default::default()
        };
        assert!(validate_status_content(&config, "q", "", &[], Some(&poll)).is_err());
    }

    #[test]
    fn test_validate_language() {
        assert_eq!(validate_language("EN").unwrap(), "en");
        assert_eq!(validate_language("pt_br").unwrap(), "pt-BR");
        assert_eq!(validate_language("zh-hant").unwrap(), "zh-Hant");
        assert!(validate_language("").is_err());
        assert!(validate_language("e").is_err());
        assert!(validate_language("en-").is_err());
        assert!(validate_language("12").is_err());
    }

    #[test]
    fn test_format_plain() {
        let result = format_plain("Hi @bob and @carol@remote.net! #Rust #rust :blobcat:\n\n<b>bye</b>");
        assert_eq!(
            result.html,
            "<p>Hi @bob and @carol@remote.net! #Rust #rust :blobcat:</p><p>&lt;b&gt;bye&lt;/b&gt;</p>"
        );
        assert_eq!(
            result.mentions,
            vec![
                ("bob".to_string(), None),
                ("carol".to_string(), Some("remote.net".to_string()))
            ]
        );
        assert_eq!(result.tags, vec!["rust"]);
        assert_eq!(result.emojis, vec!["blobcat"]);
    }

    #[test]
    fn test_format_line_breaks_and_basic() {
        assert_eq!(format_plain("a\nb").html, "<p>a<br />b</p>");
        assert_eq!(format_plain("").html, "");
        assert_eq!(format_plain_basic(" spoilers :fire: ").html, "spoilers :fire:");
        assert_eq!(format_plain_basic("a:b:c").emojis, vec!["b"]);
    }
}
