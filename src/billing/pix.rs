//! Pix "BR Code" copy-and-paste payloads (EMV QR Code, merchant presented
//! mode), as printed on invoices so clients can pay the exact amount.
//!
//! A payload is a sequence of `ID LEN VALUE` fields, where `ID` and `LEN` are
//! two ASCII digits, terminated by field `63` holding a CRC16 of everything
//! before it (including the `6304` header).

use rust_decimal::{Decimal, RoundingStrategy};

const GUI: &str = "BR.GOV.BCB.PIX";
const MAX_NAME_LEN: usize = 25;
const MAX_CITY_LEN: usize = 15;
const MAX_TXID_LEN: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PixError {
    #[error("No Pix key configured in the billing profile")]
    MissingKey,
    #[error("Pix field {id} is too long ({len} characters)")]
    FieldTooLong { id: &'static str, len: usize },
    #[error("Amount must be positive")]
    InvalidAmount,
    #[error("Malformed Pix payload")]
    Malformed,
}

/// CRC16/CCITT-FALSE: polynomial 0x1021, initial value 0xFFFF
pub fn crc16(payload: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in payload {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn field(id: &'static str, value: &str) -> Result<String, PixError> {
    let len = value.chars().count();
    if len > 99 {
        return Err(PixError::FieldTooLong { id, len });
    }
    Ok(format!("{id}{len:02}{value}"))
}

fn with_crc(mut body: String) -> String {
    body.push_str("6304");
    let crc = crc16(body.as_bytes());
    body.push_str(&format!("{crc:04X}"));
    body
}

fn format_amount(amount: Decimal) -> Result<String, PixError> {
    if amount <= Decimal::ZERO {
        return Err(PixError::InvalidAmount);
    }
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    Ok(rounded.to_string())
}

/// Keeps ASCII letters, digits and spaces, uppercased and truncated. Names
/// like "São Paulo" lose their accents first.
fn sanitize(value: &str, max_len: usize) -> String {
    value
        .chars()
        .map(strip_accent)
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_uppercase()
        .chars()
        .take(max_len)
        .collect()
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixPayload {
    pub key: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub txid: Option<String>,
    pub amount: Option<Decimal>,
}

impl PixPayload {
    pub fn new(key: impl Into<String>, merchant_name: &str, merchant_city: &str) -> Result<Self, PixError> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(PixError::MissingKey);
        }

        let merchant_name = match sanitize(merchant_name, MAX_NAME_LEN) {
            name if name.is_empty() => "RECEBEDOR".to_string(),
            name => name,
        };
        let merchant_city = match sanitize(merchant_city, MAX_CITY_LEN) {
            city if city.is_empty() => "BRASIL".to_string(),
            city => city,
        };

        Ok(Self {
            key,
            merchant_name,
            merchant_city,
            txid: None,
            amount: None,
        })
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Transaction id; only alphanumerics are allowed, `***` means "none"
    pub fn with_txid(mut self, txid: &str) -> Self {
        let cleaned: String = txid
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(MAX_TXID_LEN)
            .collect();
        self.txid = if cleaned.is_empty() { None } else { Some(cleaned) };
        self
    }

    pub fn encode(&self) -> Result<String, PixError> {
        let merchant_account = format!("{}{}", field("00", GUI)?, field("01", &self.key)?);
        let txid = self.txid.as_deref().unwrap_or("***");

        let mut body = String::new();
        body.push_str(&field("00", "01")?);
        body.push_str(&field("26", &merchant_account)?);
        body.push_str(&field("52", "0000")?);
        body.push_str(&field("53", "986")?);
        if let Some(amount) = self.amount {
            body.push_str(&field("54", &format_amount(amount)?)?);
        }
        body.push_str(&field("58", "BR")?);
        body.push_str(&field("59", &self.merchant_name)?);
        body.push_str(&field("60", &self.merchant_city)?);
        body.push_str(&field("62", &field("05", txid)?)?);

        Ok(with_crc(body))
    }
}

/// Splits a payload into its top-level `(id, value)` fields
fn parse_fields(payload: &str) -> Option<Vec<(String, String)>> {
    let mut fields = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let id = rest.get(0..2)?;
        let len: usize = rest.get(2..4)?.parse().ok()?;
        let value = rest.get(4..4 + len)?;
        fields.push((id.to_string(), value.to_string()));
        rest = &rest[4 + len..];
    }
    Some(fields)
}

/// Puts `amount` into field 54 of an existing static payload and recomputes
/// the CRC. An existing amount is replaced; a missing one is inserted before
/// the country code (58), or before the CRC when there is no field 58.
pub fn set_amount(payload: &str, amount: Decimal) -> Result<String, PixError> {
    let amount_field = field("54", &format_amount(amount)?)?;

    let fields = parse_fields(payload.trim()).ok_or(PixError::Malformed)?;
    let mut out = String::new();
    let mut inserted = false;
    for (id, value) in fields {
        match id.as_str() {
            "54" => continue,
            "63" => continue,
            "58" if !inserted => {
                out.push_str(&amount_field);
                inserted = true;
            }
            _ => {}
        }
        out.push_str(&id);
        out.push_str(&format!("{:02}", value.chars().count()));
        out.push_str(&value);
    }
    if !inserted {
        out.push_str(&amount_field);
    }

    Ok(with_crc(out))
}

/// True when the trailing CRC matches the payload
pub fn verify(payload: &str) -> bool {
    let Some(split) = payload.len().checked_sub(4) else {
        return false;
    };
    if !payload.is_char_boundary(split) {
        return false;
    }
    let (body, crc) = payload.split_at(split);
    body.ends_with("6304") && format!("{:04X}", crc16(body.as_bytes())) == crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc16_matches_ccitt_false_check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
        assert_eq!(crc16(b""), 0xFFFF);
    }

    #[test]
    fn encodes_static_payload_with_valid_crc() {
        let payload = PixPayload::new("ana@example.com", "Ana Souza", "São Paulo")
            .unwrap()
            .encode()
            .unwrap();

        assert!(payload.starts_with("000201"));
        assert!(payload.contains("0014BR.GOV.BCB.PIX0115ana@example.com"));
        assert!(payload.contains("5303986"));
        assert!(payload.contains("5802BR5909ANA SOUZA6009SAO PAULO"));
        assert!(payload.contains("62070503***"));
        let ids: Vec<String> = parse_fields(&payload).unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["00", "26", "52", "53", "58", "59", "60", "62", "63"]);
        assert!(verify(&payload));
    }

    #[test]
    fn names_without_latin_letters_use_a_placeholder() {
        let payload = PixPayload::new("ana@example.com", "山田太郎", "東京")
            .unwrap()
            .encode()
            .unwrap();

        assert!(payload.contains("5909RECEBEDOR6006BRASIL"));
        assert!(verify(&payload));
    }

    #[test]
    fn encodes_amount_and_txid() {
        let payload = PixPayload::new("12345678900", "Ana", "Recife")
            .unwrap()
            .with_amount("150.5".parse().unwrap())
            .with_txid("INV-1714564800000-007")
            .encode()
            .unwrap();

        assert!(payload.contains("5406150.505802BR"));
        assert!(payload.contains("62230519INV1714564800000007"));
        assert!(verify(&payload));
    }

    #[test]
    fn set_amount_inserts_before_country_code_and_refreshes_crc() {
        let base = PixPayload::new("key-1", "Ana", "Recife").unwrap().encode().unwrap();
        let priced = set_amount(&base, "42".parse().unwrap()).unwrap();

        assert!(priced.contains("540542.005802BR"));
        assert!(verify(&priced));
    }

    #[test]
    fn set_amount_replaces_existing_amount() {
        let base = PixPayload::new("key-1", "Ana", "Recife")
            .unwrap()
            .with_amount("10".parse().unwrap())
            .encode()
            .unwrap();
        let priced = set_amount(&base, "99.99".parse().unwrap()).unwrap();

        assert!(!priced.contains("540510.00"));
        assert!(priced.contains("540599.99"));
        assert!(verify(&priced));
    }

    #[test]
    fn rejects_missing_key_and_non_positive_amount() {
        assert_eq!(PixPayload::new("  ", "Ana", "Recife"), Err(PixError::MissingKey));

        let payload = PixPayload::new("k", "Ana", "Recife")
            .unwrap()
            .with_amount(Decimal::ZERO);
        assert_eq!(payload.encode(), Err(PixError::InvalidAmount));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let payload = PixPayload::new("k", "Ana", "Recife").unwrap().encode().unwrap();
        let tampered = payload.replacen("RECIFE", "RECIFF", 1);
        assert!(!verify(&tampered));
        assert!(!verify("63"));
    }

    #[test]
    fn set_amount_rejects_truncated_payload() {
        assert_eq!(set_amount("000201261", "1".parse().unwrap()), Err(PixError::Malformed));
    }
}
