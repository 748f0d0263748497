use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Cpf,
    Cnpj,
}

impl DocumentKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cpf" => Some(DocumentKind::Cpf),
            "cnpj" => Some(DocumentKind::Cnpj),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Cpf => "cpf",
            DocumentKind::Cnpj => "cnpj",
        }
    }

    /// Guess from the digit count when the caller did not declare a type.
    pub fn infer(digits: &str) -> Option<Self> {
        match digits.len() {
            11 => Some(DocumentKind::Cpf),
            14 => Some(DocumentKind::Cnpj),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Cpf => "CPF",
            DocumentKind::Cnpj => "CNPJ",
        })
    }
}

/// Brazilian taxpayer number with punctuation stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub kind: DocumentKind,
    pub number: String,
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid(kind: DocumentKind, digits: &str) -> bool {
    match kind {
        DocumentKind::Cpf => is_valid_cpf(digits),
        DocumentKind::Cnpj => is_valid_cnpj(digits),
    }
}

fn to_digits(s: &str) -> Option<Vec<u32>> {
    s.chars().map(|c| c.to_digit(10)).collect()
}

fn all_same(d: &[u32]) -> bool {
    d.windows(2).all(|w| w[0] == w[1])
}

pub fn is_valid_cpf(cpf: &str) -> bool {
    let Some(d) = to_digits(cpf) else {
        return false;
    };
    if d.len() != 11 || all_same(&d) {
        return false;
    }

    let check = |len: usize| -> u32 {
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, v)| v * (len as u32 + 1 - i as u32))
            .sum();
        let rest = 11 - (sum % 11);
        if rest >= 10 {
            0
        } else {
            rest
        }
    };

    check(9) == d[9] && check(10) == d[10]
}

pub fn is_valid_cnpj(cnpj: &str) -> bool {
    let Some(d) = to_digits(cnpj) else {
        return false;
    };
    if d.len() != 14 || all_same(&d) {
        return false;
    }

    const FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let check = |weights: &[u32]| -> u32 {
        let sum: u32 = d.iter().zip(weights).map(|(v, w)| v * w).sum();
        if sum % 11 < 2 {
            0
        } else {
            11 - sum % 11
        }
    };

    check(&FIRST) == d[12] && check(&SECOND) == d[13]
}
