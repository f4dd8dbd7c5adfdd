use chrono::NaiveDate;

use crate::entry::MessageEntry;

/// Messages of one calendar day, rendered under a single day separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket<'a> {
    pub day: NaiveDate,
    pub entries: Vec<&'a MessageEntry>,
}

/// Partitions entries by their precomputed day. Buckets appear in the order
/// their first entry does; entries keep sequence order within a bucket.
pub fn group_by_day(entries: &[MessageEntry]) -> Vec<DayBucket<'_>> {
    let mut buckets: Vec<DayBucket<'_>> = Vec::new();

    for entry in entries {
        let day = entry.day();
        // Sequences are time-ordered, so the match is almost always the last bucket.
        match buckets.iter_mut().rev().find(|b| b.day == day) {
            Some(bucket) => bucket.entries.push(entry),
            None => buckets.push(DayBucket {
                day,
                entries: vec![entry],
            }),
        }
    }

    buckets
}
