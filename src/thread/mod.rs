/// Thread ordering
///
/// Orders the statuses of a conversation so every parent precedes its
/// replies. Reply graphs come from remote servers and can contain cycles,
/// self replies and dangling parents; the sort tolerates all of them and
/// always emits each input status exactly once.

use crate::model::Status;
use std::collections::{HashMap, HashSet};

/// Sort `statuses` parents first
///
/// Among siblings, replies authored by `viewpoint_account_id` come first so
/// a self-thread reads continuously, then the rest in input order. Roots are
/// statuses whose parent is missing from the input or is the status itself.
/// Statuses only reachable through a cycle are emitted afterwards: from the
/// earliest unvisited input position the sort climbs parents until it meets
/// the cycle, and walks from there, so replies hanging off a cycle still
/// follow their parent.
pub fn sort_thread(statuses: Vec<Status>, viewpoint_account_id: Option<&str>) -> Vec<Status> {
    // Collapse duplicate ids, keeping the first occurrence
    let mut seen = HashSet::new();
    let statuses: Vec<Status> = statuses
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect();

    let index: HashMap<&str, usize> = statuses
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut roots = Vec::new();
    let mut parents: Vec<Option<usize>> = vec![None; statuses.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); statuses.len()];
    for (i, status) in statuses.iter().enumerate() {
        match status
            .in_reply_to_id
            .as_deref()
            .and_then(|parent| index.get(parent).copied())
        {
            Some(parent) if parent != i => {
                parents[i] = Some(parent);
                children[parent].push(i);
            }
            _ => roots.push(i),
        }
    }

    let by_viewpoint = |i: &usize| match viewpoint_account_id {
        Some(viewpoint) => statuses[*i].account_id != viewpoint,
        None => false,
    };
    // Stable: input order is kept within each group
    roots.sort_by_key(by_viewpoint);
    for siblings in children.iter_mut() {
        siblings.sort_by_key(by_viewpoint);
    }

    let mut visited = vec![false; statuses.len()];
    let mut order = Vec::with_capacity(statuses.len());
    for root in roots {
        walk(root, &children, &mut visited, &mut order);
    }
    for start in 0..statuses.len() {
        if !visited[start] {
            let entry = cycle_entry(start, &parents, &visited);
            walk(entry, &children, &mut visited, &mut order);
        }
    }

    let mut slots: Vec<Option<Status>> = statuses.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// First status met twice when climbing unvisited parents from `start`
fn cycle_entry(start: usize, parents: &[Option<usize>], visited: &[bool]) -> usize {
    let mut path = HashSet::new();
    let mut node = start;
    while path.insert(node) {
        match parents[node] {
            Some(parent) if !visited[parent] => node = parent,
            _ => break,
        }
    }
    node
}

/// Depth-first, iterative so deep threads cannot exhaust the stack
fn walk(start: usize, children: &[Vec<usize>], visited: &mut [bool], order: &mut Vec<usize>) {
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;
        order.push(node);
        for &child in children[node].iter().rev() {
            if !visited[child] {
                stack.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StatusObjectType, Visibility};
    use chrono::Utc;

    fn status(id: &str, parent: Option<&str>, author: &str) -> Status {
        Status {
            id: id.to_string(),
            uri: format!("https://example.org/statuses/{}", id),
            account_id: author.to_string(),
            in_reply_to_id: parent.map(str::to_string),
            in_reply_to_account_id: None,
            boost_of_id: None,
            content: String::new(),
            content_warning: String::new(),
            text: String::new(),
            language: "en".to_string(),
            sensitive: false,
            visibility: Visibility::Public,
            attachment_ids: Vec::new(),
            mention_ids: Vec::new(),
            tags: Vec::new(),
            emojis: Vec::new(),
            poll_id: None,
            object_type: StatusObjectType::Note,
            local: true,
            pinned_at: None,
            created_at: Utc::now(),
            edited_at: None,
            poll: None,
            attachments: Vec::new(),
        }
    }

    fn ids(sorted: &[Status]) -> Vec<&str> {
        sorted.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_branching_tree() {
        let input = vec![
            status("D", Some("B"), "x"),
            status("C", Some("A"), "x"),
            status("A", None, "x"),
            status("B", Some("A"), "x"),
        ];
        assert_eq!(ids(&sort_thread(input, None)), vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_deep_branching_tree_parents_first() {
        let input = vec![
            status("H", Some("I"), "x"),
            status("C", Some("D"), "x"),
            status("A", Some("B"), "x"),
            status("F", None, "x"),
            status("E", Some("D"), "x"),
            status("I", Some("G"), "x"),
            status("D", Some("B"), "x"),
            status("G", Some("F"), "x"),
            status("B", Some("F"), "x"),
        ];
        let sorted = sort_thread(input, None);
        assert_eq!(sorted.len(), 9);

        let pos = |id: &str| sorted.iter().position(|s| s.id == id).unwrap();
        for (parent, child) in [
            ("F", "B"),
            ("F", "G"),
            ("B", "A"),
            ("B", "D"),
            ("D", "C"),
            ("D", "E"),
            ("G", "I"),
            ("I", "H"),
        ] {
            assert!(pos(parent) < pos(child), "{} must precede {}", parent, child);
        }
    }

    #[test]
    fn test_viewpoint_replies_first() {
        let input = vec![
            status("A", None, "author"),
            status("B", Some("A"), "other"),
            status("C", Some("A"), "author"),
            status("D", Some("A"), "other"),
        ];
        assert_eq!(
            ids(&sort_thread(input, Some("author"))),
            vec!["A", "C", "B", "D"]
        );
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let input = vec![status("A", Some("B"), "x"), status("B", Some("A"), "x")];
        assert_eq!(ids(&sort_thread(input, None)), vec!["A", "B"]);
    }

    #[test]
    fn test_self_reply_is_a_root() {
        let input = vec![status("B", Some("A"), "x"), status("A", Some("A"), "x")];
        assert_eq!(ids(&sort_thread(input, None)), vec!["A", "B"]);
    }

    #[test]
    fn test_dangling_parents_and_duplicates() {
        let input = vec![
            status("B", Some("missing"), "x"),
            status("A", None, "x"),
            status("B", Some("A"), "x"),
            status("C", Some("B"), "x"),
        ];
        let sorted = sort_thread(input, None);
        assert_eq!(ids(&sorted), vec!["B", "C", "A"]);
        assert_eq!(sorted[0].in_reply_to_id.as_deref(), Some("missing"));
    }

    #[test]
    fn test_cycle_hanging_off_a_tree() {
        // R is a proper root; X and Y reply to each other
        let input = vec![
            status("Y", Some("X"), "x"),
            status("R", None, "x"),
            status("X", Some("Y"), "x"),
            status("S", Some("R"), "x"),
        ];
        assert_eq!(ids(&sort_thread(input, None)), vec!["R", "S", "Y", "X"]);
    }

    #[test]
    fn test_reply_to_cycle_member_follows_it() {
        // Z is listed first but replies to Y, which sits in a cycle with X
        let input = vec![
            status("Z", Some("Y"), "x"),
            status("X", Some("Y"), "x"),
            status("Y", Some("X"), "x"),
        ];
        let sorted = sort_thread(input, None);
        assert_eq!(ids(&sorted), vec!["Y", "Z", "X"]);

        let pos = |id: &str| sorted.iter().position(|s| s.id == id).unwrap();
        assert!(pos("Y") < pos("Z"));
    }

    #[test]
    fn test_empty_input() {
        assert!(sort_thread(Vec::new(), Some("a")).is_empty());
    }
}
