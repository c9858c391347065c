/// Sanitized paging window for list endpoints. Page and limit are
/// clamped so client-supplied values can never produce a negative
/// product before the cast to the driver's unsigned skip.
pub fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    let skip = ((page - 1) * limit) as u64;
    (page, limit, skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(page_window(None, None), (1, 20, 0));
    }

    #[test]
    fn skip_follows_page_and_limit() {
        assert_eq!(page_window(Some(3), Some(10)), (3, 10, 20));
    }

    #[test]
    fn negative_and_zero_inputs_are_clamped() {
        assert_eq!(page_window(Some(-5), Some(-20)), (1, 1, 0));
        assert_eq!(page_window(Some(0), Some(0)), (1, 1, 0));
        let (_, _, skip) = page_window(Some(2), Some(-1));
        assert_eq!(skip, 1);
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(page_window(Some(1), Some(5000)), (1, 100, 0));
    }
}
