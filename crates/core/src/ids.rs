/// Parse a path segment as a store identifier: a base-10 integer greater than zero.
pub fn parse_positive_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}
