use regex::Regex;

pub fn validate_email(email: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    re.is_match(email)
}

pub fn validate_phone(phone: &str) -> bool {
    let re = Regex::new(r"^\+?\d{7,15}$").unwrap();
    re.is_match(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_prefixed_phone_numbers() {
        assert!(validate_phone("9876543210"));
        assert!(validate_phone("+919876543210"));
        assert!(!validate_phone("98-76"));
        assert!(!validate_phone("not-a-phone"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(validate_email("dev@example.com"));
        assert!(!validate_email("dev@example"));
        assert!(!validate_email("example.com"));
    }
}
