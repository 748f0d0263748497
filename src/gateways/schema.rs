//! Where each provider puts the fields we care about in its charge response.
//!
//! Paths are JSON pointers tried in order; the first non-empty value wins.

use crate::domain::charge::{
    ChargeResponse, CustomerSummary, PixMapping, PixPayload, ProductSummary, ValidatedCharge,
};
use crate::error::RelayError;
use crate::gateways::{Provider, UpstreamReply};
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct ResponseSchema {
    pub transaction_id: &'static [&'static str],
    pub status: &'static [&'static str],
    pub qrcode: &'static [&'static str],
    pub copy_paste: &'static [&'static str],
    pub error_message: &'static [&'static str],
    /// Boolean that must be `true` for the charge to count as created.
    pub success_flag: Option<&'static str>,
}

const ERROR_MESSAGE: &[&str] = &["/message", "/error/message", "/error", "/errors/0/message"];

const BLACKCAT: ResponseSchema = ResponseSchema {
    transaction_id: &["/id", "/transaction_id"],
    status: &["/status"],
    qrcode: &["/pix/qrcode"],
    copy_paste: &["/pix/copiaECola", "/pix/qrcode"],
    error_message: ERROR_MESSAGE,
    success_flag: None,
};

const GHOSTPAY: ResponseSchema = ResponseSchema {
    transaction_id: &["/id", "/transaction_id", "/payment_id"],
    status: &["/status"],
    qrcode: &["/pix/qrcode", "/qrcode"],
    copy_paste: &["/pix/copiaECola", "/copiaECola", "/pixCode"],
    error_message: ERROR_MESSAGE,
    success_flag: None,
};

const SKALEPAY: ResponseSchema = ResponseSchema {
    transaction_id: &["/id", "/transaction_id", "/payment_id"],
    status: &["/status"],
    qrcode: &["/pix_qr_code", "/pix/qrcode"],
    copy_paste: &["/pix_code", "/pix/qrcode"],
    error_message: ERROR_MESSAGE,
    success_flag: Some("/success"),
};

const FOURM: ResponseSchema = ResponseSchema {
    transaction_id: &["/id", "/transaction_id", "/data/id"],
    status: &["/status", "/data/status"],
    qrcode: &["/pix_qr_code", "/data/pix_qr_code"],
    copy_paste: &["/pix_code", "/data/pix_code"],
    error_message: ERROR_MESSAGE,
    success_flag: None,
};

const BRAZAPAY: ResponseSchema = ResponseSchema {
    transaction_id: &["/id", "/transaction_id"],
    status: &["/status"],
    qrcode: &["/pix/qrcode", "/qr_code"],
    copy_paste: &["/pix/qrcode", "/qr_code"],
    error_message: ERROR_MESSAGE,
    success_flag: None,
};

pub fn schema_for(provider: Provider) -> &'static ResponseSchema {
    match provider {
        Provider::BlackCat => &BLACKCAT,
        Provider::GhostPay => &GHOSTPAY,
        Provider::SkalePay => &SKALEPAY,
        Provider::FourM => &FOURM,
        Provider::BrazaPay => &BRAZAPAY,
    }
}

fn text_at(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| match body.pointer(p)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

fn id_at(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| match body.pointer(p)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Turn a raw HTTP answer into the JSON body, or the error the caller sees.
pub fn interpret_reply(provider: Provider, status: u16, text: &str) -> Result<Value, RelayError> {
    let parsed = if text.trim().is_empty() {
        Ok(Value::Object(Default::default()))
    } else {
        serde_json::from_str::<Value>(text)
    };

    if !(200..300).contains(&status) {
        let message = parsed
            .as_ref()
            .ok()
            .and_then(|body| text_at(body, schema_for(provider).error_message))
            .unwrap_or_else(|| text.chars().take(200).collect());
        return Err(RelayError::upstream(provider, Some(status), message));
    }

    parsed.map_err(|e| RelayError::UpstreamParse {
        provider,
        reason: e.to_string(),
    })
}

/// Map a provider reply onto the normalized charge response.
pub fn normalize(reply: &UpstreamReply, charge: &ValidatedCharge) -> Result<ChargeResponse, RelayError> {
    let provider = reply.provider;
    let schema = schema_for(provider);
    let body = &reply.body;

    if let Some(flag) = schema.success_flag {
        if body.pointer(flag).and_then(Value::as_bool) != Some(true) {
            let message = text_at(body, schema.error_message)
                .unwrap_or_else(|| "provider did not confirm the charge".to_string());
            return Err(RelayError::upstream(provider, Some(reply.status), message));
        }
    }

    let id = id_at(body, schema.transaction_id).ok_or_else(|| {
        RelayError::upstream(provider, Some(reply.status), "response carried no transaction id")
    })?;

    let status = text_at(body, schema.status).unwrap_or_else(|| "pending".to_string());
    let qrcode = text_at(body, schema.qrcode);
    let copy_paste = text_at(body, schema.copy_paste);

    let mapping = match (&qrcode, &copy_paste) {
        (Some(_), Some(_)) => PixMapping::Complete,
        (None, None) => PixMapping::Unmapped,
        _ => PixMapping::Partial,
    };
    if mapping == PixMapping::Unmapped {
        let keys: Vec<&str> = body
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default();
        tracing::warn!(
            provider = %provider,
            transaction_id = %id,
            response_keys = ?keys,
            "pix payload not found at any mapped path"
        );
    }

    Ok(ChargeResponse {
        id,
        status,
        amount: charge.amount_minor,
        pix: PixPayload {
            qrcode: qrcode.unwrap_or_default(),
            copy_paste_code: copy_paste.unwrap_or_default(),
            mapping,
        },
        customer: CustomerSummary {
            name: charge.customer.name.clone(),
            email: charge.customer.email.clone(),
        },
        product: ProductSummary {
            title: charge.product_title().to_string(),
        },
        provider: provider.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::charge::{validate, CreatePixRequest};
    use serde_json::json;

    fn charge() -> ValidatedCharge {
        let req: CreatePixRequest = serde_json::from_value(json!({
            "credentials": {"token": "t"},
            "amount": 1000,
            "amountUnit": "cents",
            "customer": {
                "name": "Ana",
                "email": "ana@example.com",
                "document": {"number": "11144477735"}
            },
            "product": {"title": "Ebook"}
        }))
        .unwrap();
        validate(&req).unwrap()
    }

    fn reply(provider: Provider, body: Value) -> UpstreamReply {
        UpstreamReply {
            provider,
            status: 200,
            body,
        }
    }

    #[test]
    fn maps_blackcat_nested_pix() {
        let r = reply(
            Provider::BlackCat,
            json!({"id": 123, "status": "waiting_payment", "pix": {"qrcode": "00020126br.gov.bcb.pix"}}),
        );
        let out = normalize(&r, &charge()).unwrap();
        assert_eq!(out.id, "123");
        assert_eq!(out.status, "waiting_payment");
        assert_eq!(out.pix.copy_paste_code, "00020126br.gov.bcb.pix");
        assert_eq!(out.pix.mapping, PixMapping::Complete);
        assert_eq!(out.amount, 1000);
    }

    #[test]
    fn maps_fourm_flat_fields() {
        let r = reply(
            Provider::FourM,
            json!({"id": "pay_1", "pix_code": "000201...", "pix_qr_code": "data:image/png;base64,AAA"}),
        );
        let out = normalize(&r, &charge()).unwrap();
        assert_eq!(out.pix.copy_paste_code, "000201...");
        assert_eq!(out.pix.qrcode, "data:image/png;base64,AAA");
        assert_eq!(out.status, "pending");
    }

    #[test]
    fn unmapped_pix_degrades_to_empty_strings() {
        let r = reply(Provider::GhostPay, json!({"id": "g1", "status": "pending", "qr": {"weird": "x"}}));
        let out = normalize(&r, &charge()).unwrap();
        assert_eq!(out.id, "g1");
        assert_eq!(out.status, "pending");
        assert_eq!(out.pix.qrcode, "");
        assert_eq!(out.pix.copy_paste_code, "");
        assert_eq!(out.pix.mapping, PixMapping::Unmapped);
    }

    #[test]
    fn skale_requires_success_flag() {
        let r = reply(Provider::SkalePay, json!({"success": false, "message": "documento invalido"}));
        let err = normalize(&r, &charge()).unwrap_err();
        assert!(matches!(err, RelayError::UpstreamGateway { ref message, .. } if message == "documento invalido"));
    }

    #[test]
    fn missing_transaction_id_is_a_gateway_error() {
        let r = reply(Provider::BrazaPay, json!({"status": "pending"}));
        assert!(matches!(
            normalize(&r, &charge()),
            Err(RelayError::UpstreamGateway { .. })
        ));
    }

    #[test]
    fn non_success_status_carries_upstream_message() {
        let err = interpret_reply(Provider::BlackCat, 401, r#"{"message":"invalid key"}"#).unwrap_err();
        match err {
            RelayError::UpstreamGateway { status, message, .. } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "invalid key");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = interpret_reply(Provider::BlackCat, 502, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, RelayError::UpstreamGateway { ref message, .. } if message.contains("bad gateway")));
    }

    #[test]
    fn success_with_html_is_a_parse_error() {
        assert!(matches!(
            interpret_reply(Provider::GhostPay, 200, "<html>ok</html>"),
            Err(RelayError::UpstreamParse { .. })
        ));
        assert_eq!(interpret_reply(Provider::GhostPay, 201, "").unwrap(), json!({}));
    }
}
