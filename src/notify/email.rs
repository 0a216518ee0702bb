use regex::Regex;

const MAX_EMAIL_LENGTH: usize = 254;

/// Syntactic check of a stored address before mail is attempted.
#[derive(Debug, Clone)]
pub struct EmailValidator {
    local_part: Regex,
    domain: Regex,
}

impl EmailValidator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            local_part: Regex::new(
                r"(?i)^[-!#$%&'*+/=?^_`{}|~0-9a-z]+(\.[-!#$%&'*+/=?^_`{}|~0-9a-z]+)*$",
            )?,
            domain: Regex::new(
                r"(?i)^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$",
            )?,
        })
    }

    pub fn is_valid(&self, email: &str) -> bool {
        if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
            return false;
        }
        match email.rsplit_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && self.local_part.is_match(local) && self.domain.is_match(domain)
            }
            None => false,
        }
    }
}
