//! Display masking for member contact details.
//!
//! This is a presentation mask, not access control. Whether contacts are
//! shown in the clear is decided per request and passed in as a
//! [`ContactVisibility`] value.

use crate::models::{Booking, BookingMember};

const MASK: char = '•';
const HIDDEN_EMAIL: &str = "***@***.***";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContactVisibility {
    #[default]
    Masked,
    Revealed,
}

impl ContactVisibility {
    pub fn email(&self, email: &str) -> String {
        match self {
            ContactVisibility::Revealed => email.to_string(),
            ContactVisibility::Masked => mask_email(email),
        }
    }

    pub fn phone(&self, phone: &str) -> String {
        match self {
            ContactVisibility::Revealed => phone.to_string(),
            ContactVisibility::Masked => mask_phone(phone),
        }
    }

    pub fn member(&self, member: BookingMember) -> BookingMember {
        BookingMember {
            email: self.email(&member.email),
            phone_number: member.phone_number.as_deref().map(|p| self.phone(p)),
            ..member
        }
    }

    pub fn bookings(&self, bookings: Vec<Booking>) -> Vec<Booking> {
        bookings
            .into_iter()
            .map(|mut booking| {
                booking.member = self.member(booking.member);
                booking
            })
            .collect()
    }
}

/// Keeps the leading characters of `part`: two when it is longer than two,
/// otherwise one.
fn mask_part(part: &str) -> String {
    let len = part.chars().count();
    let keep = if len > 2 { 2 } else { len.min(1) };
    part.chars()
        .take(keep)
        .chain(std::iter::repeat_n(MASK, len - keep))
        .collect()
}

pub fn mask_email(email: &str) -> String {
    if email.is_empty() {
        return String::new();
    }
    let mut parts = email.split('@');
    let username = parts.next().unwrap_or_default();
    let Some(domain) = parts.next() else {
        return HIDDEN_EMAIL.to_string();
    };

    let (domain_name, extension) = match domain.split_once('.') {
        Some((name, rest)) => (name, rest.split('.').next()),
        None => (domain, None),
    };
    let masked = format!("{}@{}", mask_part(username), mask_part(domain_name));
    match extension {
        Some(ext) => format!("{masked}.{ext}"),
        None => masked,
    }
}

pub fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let len = digits.chars().count();
    if len < 4 {
        return MASK.to_string().repeat(len);
    }
    digits
        .chars()
        .take(2)
        .chain(std::iter::repeat_n(MASK, len - 2))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("priya@gmail.com"), "pr•••@gm•••.com");
        assert_eq!(mask_email("ab@io.in"), "a•@i•.in");
        assert_eq!(mask_email("no-domain"), HIDDEN_EMAIL);
        assert_eq!(mask_email(""), "");
    }

    #[test]
    fn test_mask_email_keeps_first_extension_label() {
        assert_eq!(mask_email("sam@studio.co.in"), "sa•@st••••.co");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+91 98200-12345"), "91••••••••••");
        assert_eq!(mask_phone("123"), "•••");
        assert_eq!(mask_phone(""), "");
    }

    #[test]
    fn test_visibility_is_explicit() {
        let member = BookingMember {
            id: 1,
            first_name: "Priya".to_string(),
            last_name: "Shah".to_string(),
            email: "priya@gmail.com".to_string(),
            phone_number: Some("9820012345".to_string()),
            picture_url: None,
        };
        let masked = ContactVisibility::Masked.member(member.clone());
        assert_eq!(masked.email, "pr•••@gm•••.com");
        assert_eq!(masked.phone_number.as_deref(), Some("98••••••••"));
        assert_eq!(masked.first_name, "Priya");

        let revealed = ContactVisibility::Revealed.member(member.clone());
        assert_eq!(revealed, member);
    }
}
