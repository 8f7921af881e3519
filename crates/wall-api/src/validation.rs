//! Input rules for registration and posting. Each check returns the
//! user-facing message on failure so handlers can collect them per field.

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password12", "password123", "passw0rd", "12345678",
    "123456789", "1234567890", "qwerty123", "qwertyuiop", "iloveyou", "sunshine",
    "princess", "football", "baseball", "welcome1", "abc12345", "letmein1",
    "trustno1", "superman", "starwars", "whatever", "11111111", "00000000",
    "changeme", "admin123",
];

/// A required text field, with surrounding whitespace removed.
pub fn required_text(value: Option<&str>) -> Result<String, &'static str> {
    let value = value.ok_or(REQUIRED)?.trim();
    if value.is_empty() {
        return Err(BLANK);
    }
    Ok(value.to_string())
}

/// A required secret. Passwords are taken verbatim, whitespace included.
pub fn required_secret(value: Option<&str>) -> Result<String, &'static str> {
    match value {
        None => Err(REQUIRED),
        Some("") => Err(BLANK),
        Some(v) => Ok(v.to_string()),
    }
}

pub fn username(value: Option<&str>) -> Result<String, String> {
    let value = required_text(value)?;
    if value.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Ensure this field has no more than {USERNAME_MAX_LEN} characters."
        ));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !value.chars().all(allowed) {
        return Err("Enter a valid username. This value may contain only letters, \
                    numbers, and @/./+/-/_ characters."
            .to_string());
    }
    Ok(value)
}

pub fn email(value: Option<&str>) -> Result<String, &'static str> {
    let value = required_text(value)?;
    if is_valid_email(&value) {
        Ok(value)
    } else {
        Err("Enter a valid email address.")
    }
}

fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || local.chars().any(char::is_whitespace) {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let label_ok = |l: &&str| {
        !l.is_empty()
            && l.len() <= 63
            && !l.starts_with('-')
            && !l.ends_with('-')
            && l.chars().all(|c| c.is_alphanumeric() || c == '-')
    };
    if !labels.iter().all(label_ok) {
        return false;
    }

    let tld = labels[labels.len() - 1];
    tld.starts_with("xn--") || (tld.len() >= 2 && tld.chars().all(char::is_alphabetic))
}

/// Strength policy for new passwords. `username` and `email` feed the
/// similarity check. Returns every violated rule.
pub fn password_strength(password: &str, username: Option<&str>, email: Option<&str>) -> Vec<String> {
    let mut problems = Vec::new();
    let lowered = password.to_lowercase();

    let mut attributes: Vec<(&str, &str)> = Vec::new();
    if let Some(u) = username {
        attributes.push((u, "username"));
    }
    if let Some(e) = email {
        attributes.push((e, "email address"));
        if let Some((local, _)) = e.split_once('@') {
            attributes.push((local, "email address"));
        }
    }
    if let Some((_, label)) = attributes
        .iter()
        .find(|(value, _)| too_similar(&lowered, &value.to_lowercase()))
    {
        problems.push(format!("The password is too similar to the {label}."));
    }

    if password.chars().count() < PASSWORD_MIN_LEN {
        problems.push(format!(
            "This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."
        ));
    }
    if COMMON_PASSWORDS.contains(&lowered.trim()) {
        problems.push("This password is too common.".to_string());
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}

fn too_similar(password: &str, attribute: &str) -> bool {
    if attribute.chars().count() < 3 {
        return false;
    }
    password.contains(attribute) || attribute.contains(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text(Some("  hi  ")), Ok("hi".to_string()));
        assert_eq!(required_text(Some("   ")), Err(BLANK));
        assert_eq!(required_text(None), Err(REQUIRED));
    }

    #[test]
    fn secrets_keep_whitespace() {
        assert_eq!(required_secret(Some(" pass ")), Ok(" pass ".to_string()));
        assert_eq!(required_secret(Some("")), Err(BLANK));
    }

    #[test]
    fn usernames() {
        assert_eq!(username(Some("jane.doe+wall@x")), Ok("jane.doe+wall@x".to_string()));
        assert!(username(Some("jane doe")).is_err());
        assert!(username(Some("semi;colon")).is_err());
        assert!(username(Some(&"a".repeat(151))).is_err());
        assert!(username(Some(&"a".repeat(150))).is_ok());
    }

    #[test]
    fn emails() {
        for ok in ["a@example.com", "first.last+tag@mail.example.org", "x@xn--p1ai.xn--p1ai"] {
            assert!(email(Some(ok)).is_ok(), "{ok}");
        }
        for bad in ["", "plain", "@example.com", "a@b", "a@-b.com", "a b@c.com", "a@b.c", "a@b..com"] {
            assert!(email(Some(bad)).is_err(), "{bad}");
        }
    }

    #[test]
    fn strong_password_passes() {
        assert!(password_strength("StrongPass123!", Some("newbie"), Some("newbie@example.com")).is_empty());
    }

    #[test]
    fn weak_passwords_report_each_rule() {
        let problems = password_strength("1234", None, None);
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.contains("too short")));
        assert!(problems.iter().any(|p| p.contains("entirely numeric")));

        assert_eq!(
            password_strength("Password123", None, None),
            vec!["This password is too common.".to_string()]
        );
    }

    #[test]
    fn password_similar_to_username_or_email() {
        let problems = password_strength("newbie2024!", Some("Newbie"), None);
        assert_eq!(problems, vec!["The password is too similar to the username.".to_string()]);

        let problems = password_strength("xx-janedoe-xx", Some("zz"), Some("janedoe@example.com"));
        assert_eq!(problems, vec!["The password is too similar to the email address.".to_string()]);
    }
}
