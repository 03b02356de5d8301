//! Seat labels as stored on occurrences and bookings.
//!
//! The column format is a comma-separated list (`"A1,A2,C4"`). Labels compare
//! case-insensitively and are kept in case-insensitive order so the stored
//! string is deterministic.

use std::collections::BTreeMap;

/// A case-insensitive set of seat labels.
///
/// Keys are the uppercased label; values keep the first spelling seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatSet {
    seats: BTreeMap<String, String>,
}

impl SeatSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn contains(&self, seat: &str) -> bool {
        self.seats.contains_key(&key(seat))
    }

    /// Returns `false` if an equal label (ignoring case) was already present.
    pub fn insert(&mut self, seat: &str) -> bool {
        let seat = seat.trim();
        if seat.is_empty() {
            return false;
        }

        match self.seats.entry(key(seat)) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(seat.to_string());
                true
            }
        }
    }

    pub fn remove(&mut self, seat: &str) -> bool {
        self.seats.remove(&key(seat)).is_some()
    }

    pub fn extend(&mut self, other: &SeatSet) {
        for seat in other.iter() {
            self.insert(seat);
        }
    }

    pub fn remove_all(&mut self, other: &SeatSet) {
        for seat in other.iter() {
            self.remove(seat);
        }
    }

    /// Labels of `other` that are already in this set.
    pub fn overlap(&self, other: &SeatSet) -> Vec<String> {
        other
            .iter()
            .filter(|seat| self.contains(seat))
            .map(str::to_string)
            .collect()
    }

    pub fn is_disjoint(&self, other: &SeatSet) -> bool {
        other.iter().all(|seat| !self.contains(seat))
    }

    /// Labels in case-insensitive order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.seats.values().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SeatSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SeatSet::new();
        for seat in iter {
            set.insert(seat.as_ref());
        }
        set
    }
}

fn key(seat: &str) -> String {
    seat.trim().to_uppercase()
}

/// Parses a stored seats column. `None` and blank input give an empty set.
pub fn parse(raw: Option<&str>) -> SeatSet {
    raw.map(|raw| raw.split(',').collect())
        .unwrap_or_default()
}

/// Serializes a set for storage; an empty set is stored as `NULL`.
pub fn serialize(seats: &SeatSet) -> Option<String> {
    if seats.is_empty() {
        return None;
    }
    Some(seats.iter().collect::<Vec<_>>().join(","))
}

/// Cleans a requested seat list: trims, drops blanks and case-insensitive
/// duplicates. The first spelling of each label wins.
pub fn normalize<I, S>(seats: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = SeatSet::new();
    let mut out = Vec::new();
    for seat in seats {
        let seat = seat.as_ref().trim();
        if seen.insert(seat) {
            out.push(seat.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handles_missing_and_blank_input() {
        assert!(parse(None).is_empty());
        assert!(parse(Some("")).is_empty());
        assert!(parse(Some(" , ,")).is_empty());
    }

    #[test]
    fn parse_trims_and_dedups_ignoring_case() {
        let seats = parse(Some(" a1, A1 ,b2,,B2 "));
        assert_eq!(seats.len(), 2);
        assert!(seats.contains("A1"));
        assert!(seats.contains("b2"));
    }

    #[test]
    fn serialize_is_sorted_and_empty_is_null() {
        assert_eq!(serialize(&SeatSet::new()), None);

        let seats: SeatSet = ["c3", "A1", "b2"].into_iter().collect();
        assert_eq!(serialize(&seats).as_deref(), Some("A1,b2,c3"));
    }

    #[test]
    fn stored_column_survives_a_reparse() {
        let seats = parse(Some("B2,a1"));
        let stored = serialize(&seats);
        assert_eq!(parse(stored.as_deref()), seats);
    }

    #[test]
    fn normalize_keeps_first_spelling() {
        let seats = normalize(["  a1", "A1", "", "b2 ", "   "]);
        assert_eq!(seats, vec!["a1".to_string(), "b2".to_string()]);
    }

    #[test]
    fn overlap_reports_colliding_labels() {
        let occupied = parse(Some("A1,A2"));
        let requested = parse(Some("a2,A3"));
        assert_eq!(occupied.overlap(&requested), vec!["a2".to_string()]);
        assert!(!occupied.is_disjoint(&requested));
        assert!(occupied.is_disjoint(&parse(Some("B1"))));
    }

    #[test]
    fn remove_all_frees_only_given_seats() {
        let mut occupied = parse(Some("A1,A2,A3"));
        occupied.remove_all(&parse(Some("a2")));
        assert_eq!(serialize(&occupied).as_deref(), Some("A1,A3"));
    }
}
