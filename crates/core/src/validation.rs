//! Field format validation.
//!
//! Stateless checks shared by the server (request validation) and the
//! client (inline field errors). Messages are user-facing and written in
//! Brazilian Portuguese, the language of the admin panel.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Email;

/// Slugs reserved for top-level routes of the public menu site.
pub const RESERVED_SLUGS: &[&str] = &[
    "admin", "api", "app", "auth", "login", "logout", "register", "static", "www", "menu",
    "dashboard", "settings",
];

/// Minimum and maximum length of a URL slug.
pub const SLUG_MIN_LENGTH: usize = 3;
pub const SLUG_MAX_LENGTH: usize = 50;

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap()
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern
    Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d$").unwrap()
});

static RANDOM_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// A single field validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Campo obrigatório")]
    Required,
    #[error("Deve ter no máximo {max} caracteres")]
    TooLong { max: usize },
    #[error("Telefone inválido")]
    InvalidPhone,
    #[error("CEP inválido")]
    InvalidCep,
    #[error("CNPJ inválido")]
    InvalidCnpj,
    #[error("CPF inválido")]
    InvalidCpf,
    #[error("E-mail inválido")]
    InvalidEmail,
    #[error("Chave PIX inválida")]
    InvalidPixKey,
    #[error("URL deve ter entre {SLUG_MIN_LENGTH} e {SLUG_MAX_LENGTH} caracteres")]
    SlugLength,
    #[error("URL deve conter apenas letras minúsculas, números e hífens")]
    SlugFormat,
    #[error("Esta URL é reservada")]
    SlugReserved,
    #[error("Horário inválido (use HH:MM)")]
    InvalidTime,
    #[error("O horário de abertura deve ser anterior ao de fechamento")]
    OpenAfterClose,
    #[error("{0}")]
    Other(String),
}

/// Field errors keyed by field path (e.g. `name`, `0.address.address_zip_code`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `path`, replacing any previous one.
    pub fn insert(&mut self, path: impl Into<String>, error: impl ToString) {
        self.0.insert(path.into(), error.to_string());
    }

    /// Record the outcome of a check: errors are stored, `Ok` clears the path.
    pub fn record(&mut self, path: &str, result: Result<(), ValidationError>) {
        match result {
            Ok(()) => {
                self.0.remove(path);
            }
            Err(e) => self.insert(path, e),
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.0.remove(path)
    }

    /// Remove every error whose path is `prefix` or lies below it.
    pub fn remove_prefix(&mut self, prefix: &str) {
        let nested = format!("{prefix}.");
        self.0
            .retain(|path, _| path != prefix && !path.starts_with(&nested));
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Merge another set of errors, keeping their paths.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Merge another set of errors, prefixing their paths.
    pub fn extend_prefixed(&mut self, prefix: &str, other: Self) {
        for (path, message) in other.0 {
            self.0.insert(format!("{prefix}.{path}"), message);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when empty, `Err(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the collected errors when there is at least one.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(path, message)| format!("{path}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// Keep only ASCII digits.
#[must_use]
pub fn only_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Require a non-blank value no longer than `max` characters.
///
/// # Errors
///
/// [`ValidationError::Required`] or [`ValidationError::TooLong`].
pub fn require_text(value: &str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required);
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { max });
    }
    Ok(())
}

fn national_phone_digits(value: &str) -> String {
    let digits = only_digits(value);
    if (digits.len() == 12 || digits.len() == 13) && digits.starts_with("55") {
        digits.get(2..).unwrap_or_default().to_owned()
    } else {
        digits
    }
}

/// Brazilian phone: area code (11-99) plus 8 digits, or 9 digits starting
/// with 9 for mobiles. A leading `+55` country code is accepted.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    let digits = national_phone_digits(value);
    let bytes = digits.as_bytes();
    match bytes {
        [a, b, rest @ ..] if (rest.len() == 8 || rest.len() == 9) => {
            let area_ok = *a != b'0' && *b != b'0' || (*a != b'0' && *b == b'0' && *a != b'1');
            let mobile_ok = rest.len() == 8 || rest.first() == Some(&b'9');
            area_ok && mobile_ok
        }
        _ => false,
    }
}

/// Validate an optional phone field (blank is allowed).
///
/// # Errors
///
/// [`ValidationError::InvalidPhone`] for a non-blank malformed number.
pub fn check_optional_phone(value: Option<&str>) -> Result<(), ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(v) if is_valid_phone(v) => Ok(()),
        Some(_) => Err(ValidationError::InvalidPhone),
    }
}

/// Format a valid phone as `(11) 98765-4321` / `(11) 3456-7890`.
#[must_use]
pub fn format_phone(value: &str) -> Option<String> {
    if !is_valid_phone(value) {
        return None;
    }
    let digits = national_phone_digits(value);
    let (area, number) = digits.split_at(2);
    let (head, tail) = number.split_at(number.len() - 4);
    Some(format!("({area}) {head}-{tail}"))
}

/// CEP (Brazilian postal code): 8 digits, not all zero.
#[must_use]
pub fn is_valid_cep(value: &str) -> bool {
    let digits = only_digits(value);
    let punctuation_ok = value
        .chars()
        .all(|c| c.is_ascii_digit() || c == '-' || c == '.' || c == ' ');
    punctuation_ok && digits.len() == 8 && digits.chars().any(|c| c != '0')
}

/// Format a valid CEP as `01310-100`.
#[must_use]
pub fn format_cep(value: &str) -> Option<String> {
    if !is_valid_cep(value) {
        return None;
    }
    let digits = only_digits(value);
    let (head, tail) = digits.split_at(5);
    Some(format!("{head}-{tail}"))
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rest = sum % 11;
    if rest < 2 { 0 } else { 11 - rest }
}

fn to_digit_vec(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w.first() == w.get(1))
}

/// CNPJ: 14 digits with both check digits valid.
#[must_use]
pub fn is_valid_cnpj(value: &str) -> bool {
    const FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let digits = to_digit_vec(value);
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }
    let (Some(base), Some(&d1), Some(&d2)) = (digits.get(..12), digits.get(12), digits.get(13))
    else {
        return false;
    };
    if check_digit(base, &FIRST) != d1 {
        return false;
    }
    digits
        .get(..13)
        .is_some_and(|with_first| check_digit(with_first, &SECOND) == d2)
}

/// CPF: 11 digits with both check digits valid.
#[must_use]
pub fn is_valid_cpf(value: &str) -> bool {
    const FIRST: [u32; 9] = [10, 9, 8, 7, 6, 5, 4, 3, 2];
    const SECOND: [u32; 10] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];

    let digits = to_digit_vec(value);
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }
    let (Some(base), Some(&d1), Some(&d2)) = (digits.get(..9), digits.get(9), digits.get(10))
    else {
        return false;
    };
    if check_digit(base, &FIRST) != d1 {
        return false;
    }
    digits
        .get(..10)
        .is_some_and(|with_first| check_digit(with_first, &SECOND) == d2)
}

/// The kinds of key accepted by the PIX instant-payment system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    /// Random key issued by the bank (a UUID).
    Random,
}

impl PixKeyType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Random => "random",
        }
    }
}

impl std::str::FromStr for PixKeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpf" => Ok(Self::Cpf),
            "cnpj" => Ok(Self::Cnpj),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "random" => Ok(Self::Random),
            _ => Err(format!("unknown PIX key type: {s}")),
        }
    }
}

/// Validate a PIX key of the declared type.
///
/// # Errors
///
/// Returns the type-specific error, or [`ValidationError::Required`] for a
/// blank key.
pub fn validate_pix_key(key_type: PixKeyType, key: &str) -> Result<(), ValidationError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::Required);
    }
    let valid = match key_type {
        PixKeyType::Cpf => is_valid_cpf(key),
        PixKeyType::Cnpj => is_valid_cnpj(key),
        PixKeyType::Email => Email::parse(key).is_ok(),
        PixKeyType::Phone => is_valid_phone(key),
        PixKeyType::Random => RANDOM_KEY_RE.is_match(key),
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidPixKey)
    }
}

/// Guess the type of a PIX key from its shape.
#[must_use]
pub fn detect_pix_key_type(key: &str) -> Option<PixKeyType> {
    let key = key.trim();
    if key.contains('@') {
        return Email::parse(key).ok().map(|_| PixKeyType::Email);
    }
    if RANDOM_KEY_RE.is_match(key) {
        return Some(PixKeyType::Random);
    }
    if key.starts_with('+') {
        return is_valid_phone(key).then_some(PixKeyType::Phone);
    }
    if is_valid_cpf(key) {
        return Some(PixKeyType::Cpf);
    }
    if is_valid_cnpj(key) {
        return Some(PixKeyType::Cnpj);
    }
    is_valid_phone(key).then_some(PixKeyType::Phone)
}

/// Validate a URL slug (restaurant or location `url_name`).
///
/// # Errors
///
/// Length, character-set or reserved-word violations.
pub fn validate_url_slug(slug: &str) -> Result<(), ValidationError> {
    let len = slug.chars().count();
    if !(SLUG_MIN_LENGTH..=SLUG_MAX_LENGTH).contains(&len) {
        return Err(ValidationError::SlugLength);
    }
    if !SLUG_RE.is_match(slug) {
        return Err(ValidationError::SlugFormat);
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Err(ValidationError::SlugReserved);
    }
    Ok(())
}

const fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Derive a URL slug from a display name.
///
/// ```
/// use tavola_core::validation::slugify;
///
/// assert_eq!(slugify("Cantina São João  (Centro)"), "cantina-sao-joao-centro");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars().map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.len() > SLUG_MAX_LENGTH {
        slug.truncate(SLUG_MAX_LENGTH);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

/// `HH:MM` on a 24h clock.
#[must_use]
pub fn is_valid_time_of_day(value: &str) -> bool {
    TIME_RE.is_match(value)
}

/// Minutes since midnight for a valid `HH:MM`.
#[must_use]
pub fn minutes_of_day(value: &str) -> Option<u32> {
    if !is_valid_time_of_day(value) {
        return None;
    }
    let (hours, minutes) = value.split_once(':')?;
    Some(hours.parse::<u32>().ok()? * 60 + minutes.parse::<u32>().ok()?)
}
