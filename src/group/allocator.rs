//! The pure partition allocator spec.md 4.G describes: `(members, partitions) -> assignment`,
//! deterministic given sorted inputs, with no dependence on hash iteration order.

use std::collections::BTreeMap;

/// A `member -> topic -> [partition_id]` assignment.
pub type Assignment = BTreeMap<String, BTreeMap<String, Vec<i32>>>;

/// Fans every `(topic, partition)` pair the group subscribes to evenly across `members` by
/// round-robin over the sorted, flattened `(topic, partition)` list. `members` need not be
/// pre-sorted; sorting happens here so the result depends only on group membership, never on
/// hash-map iteration order.
pub fn round_robin(members: &[String], topics: &BTreeMap<String, Vec<i32>>) -> Assignment {
    let mut sorted_members = members.to_vec();
    sorted_members.sort();

    let mut assignment: Assignment = sorted_members
        .iter()
        .map(|m| (m.clone(), BTreeMap::new()))
        .collect();

    if sorted_members.is_empty() {
        return assignment;
    }

    let mut flattened: Vec<(&String, i32)> = Vec::new();
    for (topic, partitions) in topics {
        let mut partitions = partitions.clone();
        partitions.sort_unstable();
        for partition in partitions {
            flattened.push((topic, partition));
        }
    }
    flattened.sort_by(|a, b| a.0.cmp(b.0).then(a.1.cmp(&b.1)));

    for (i, (topic, partition)) in flattened.into_iter().enumerate() {
        let member = &sorted_members[i % sorted_members.len()];
        assignment
            .get_mut(member)
            .expect("member was just inserted above")
            .entry(topic.clone())
            .or_default()
            .push(partition);
    }

    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(pairs: &[(&str, i32)]) -> BTreeMap<String, Vec<i32>> {
        let mut map: BTreeMap<String, Vec<i32>> = BTreeMap::new();
        for &(topic, count) in pairs {
            map.insert(topic.to_string(), (0..count).collect());
        }
        map
    }

    #[test]
    fn distributes_evenly_across_members() {
        let members = vec!["a".to_string(), "b".to_string()];
        let assignment = round_robin(&members, &topics(&[("t", 4)]));
        assert_eq!(assignment["a"]["t"].len(), 2);
        assert_eq!(assignment["b"]["t"].len(), 2);
    }

    #[test]
    fn is_stable_for_identical_input() {
        let members = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let topics = topics(&[("t1", 3), ("t2", 2)]);
        let first = round_robin(&members, &topics);
        let second = round_robin(&members, &topics);
        assert_eq!(first, second);
    }

    #[test]
    fn every_member_gets_every_subscribed_topic_entry_or_none() {
        let members = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let assignment = round_robin(&members, &topics(&[("t", 1)]));
        let total: usize = assignment.values().map(|m| m.values().map(Vec::len).sum::<usize>()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn no_members_yields_no_assignment() {
        let assignment = round_robin(&[], &topics(&[("t", 3)]));
        assert!(assignment.is_empty());
    }
}
