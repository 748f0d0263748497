use crate::domain::document::{self, Document, DocumentKind};
use crate::error::RelayError;
use serde::{Deserialize, Serialize};

/// Unit the caller used for `amount`. Never inferred from magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountUnit {
    #[serde(alias = "minor")]
    Cents,
    #[serde(alias = "major")]
    Reais,
}

impl AmountUnit {
    pub fn to_minor(self, amount: f64, field: &str) -> Result<i64, RelayError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RelayError::validation(format!("{field} must be a positive number")));
        }
        let minor = match self {
            AmountUnit::Cents => {
                if amount.fract() != 0.0 {
                    return Err(RelayError::validation(format!(
                        "{field} must be a whole number of cents"
                    )));
                }
                amount
            }
            AmountUnit::Reais => (amount * 100.0).round(),
        };
        if minor < 1.0 || minor > i64::MAX as f64 {
            return Err(RelayError::validation(format!("{field} is out of range")));
        }
        Ok(minor as i64)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredentials {
    pub token: Option<String>,
    pub name: Option<String>,
    pub public_key: Option<String>,
    pub offer: Option<OfferRef>,
    pub use_tax: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentInput {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<DocumentInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub title: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub unit_price: Option<f64>,
    pub quantity: Option<u32>,
    pub tangible: Option<bool>,
}

/// Body of `POST /pix/{integration}`. Everything is optional at the serde
/// level so that missing fields surface as validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePixRequest {
    pub credentials: Option<ClientCredentials>,
    pub amount: Option<f64>,
    pub amount_unit: Option<AmountUnit>,
    pub description: Option<String>,
    pub customer: Option<CustomerInput>,
    pub product: Option<ProductInput>,
    #[serde(default)]
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferLookup {
    ById { id: String, name: Option<String> },
    ByName(String),
}

pub const DEFAULT_OFFER_NAME: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document: Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub title: String,
    pub unit_amount_minor: i64,
    pub quantity: u32,
    pub tangible: bool,
}

/// A charge request that passed every local check.
#[derive(Debug, Clone)]
pub struct ValidatedCharge {
    pub client_token: String,
    pub client_name: String,
    pub client_public_key: Option<String>,
    pub offer: OfferLookup,
    pub use_tax: bool,
    pub amount_minor: i64,
    pub description: String,
    pub customer: Customer,
    pub items: Vec<LineItem>,
}

impl ValidatedCharge {
    pub fn product_title(&self) -> &str {
        self.items
            .first()
            .map(|i| i.title.as_str())
            .unwrap_or(self.description.as_str())
    }
}

fn required(value: Option<&String>, field: &str) -> Result<String, RelayError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RelayError::validation(format!("{field} is required")))
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn validate(req: &CreatePixRequest) -> Result<ValidatedCharge, RelayError> {
    let credentials = req
        .credentials
        .as_ref()
        .ok_or_else(|| RelayError::validation("credentials is required"))?;
    let client_token = required(credentials.token.as_ref(), "credentials.token")?;

    let customer_in = req
        .customer
        .as_ref()
        .ok_or_else(|| RelayError::validation("customer is required"))?;

    let product_title = req
        .product
        .as_ref()
        .and_then(|p| non_empty(p.title.as_ref()));
    if product_title.is_none() && req.items.is_empty() {
        return Err(RelayError::validation("product.title or items is required"));
    }

    let amount = req
        .amount
        .ok_or_else(|| RelayError::validation("amount is required"))?;
    let unit = req.amount_unit.ok_or_else(|| {
        RelayError::validation("amountUnit is required ('cents' or 'reais')")
    })?;
    let amount_minor = unit.to_minor(amount, "amount")?;

    let customer = validate_customer(customer_in)?;

    let items = if req.items.is_empty() {
        vec![LineItem {
            title: product_title.clone().unwrap_or_default(),
            unit_amount_minor: amount_minor,
            quantity: 1,
            tangible: true,
        }]
    } else {
        req.items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let title = non_empty(item.title.as_ref())
                    .or_else(|| non_empty(item.name.as_ref()))
                    .ok_or_else(|| RelayError::validation(format!("items[{i}].title is required")))?;
                let unit_price = item.unit_price.or(item.price).ok_or_else(|| {
                    RelayError::validation(format!("items[{i}].unitPrice is required"))
                })?;
                let quantity = item.quantity.unwrap_or(1);
                if quantity == 0 {
                    return Err(RelayError::validation(format!(
                        "items[{i}].quantity must be at least 1"
                    )));
                }
                Ok(LineItem {
                    title,
                    unit_amount_minor: unit.to_minor(unit_price, &format!("items[{i}].unitPrice"))?,
                    quantity,
                    tangible: item.tangible.unwrap_or(true),
                })
            })
            .collect::<Result<Vec<_>, _>>()?
    };
    check_items_total(&items, amount_minor)?;

    let description = non_empty(req.description.as_ref())
        .or(product_title)
        .unwrap_or_else(|| items[0].title.clone());

    let offer_ref = credentials.offer.clone().unwrap_or_default();
    let offer = match (non_empty(offer_ref.id.as_ref()), non_empty(offer_ref.name.as_ref())) {
        (Some(id), name) => OfferLookup::ById { id, name },
        (None, Some(name)) => OfferLookup::ByName(name),
        (None, None) => OfferLookup::ByName(DEFAULT_OFFER_NAME.to_string()),
    };

    Ok(ValidatedCharge {
        client_name: non_empty(credentials.name.as_ref()).unwrap_or_else(|| "unnamed".to_string()),
        client_public_key: non_empty(credentials.public_key.as_ref()),
        client_token,
        offer,
        use_tax: credentials.use_tax.unwrap_or(false),
        amount_minor,
        description,
        customer,
        items,
    })
}

/// Line items must add up to the charged amount exactly.
fn check_items_total(items: &[LineItem], amount_minor: i64) -> Result<(), RelayError> {
    let total = items.iter().try_fold(0i64, |acc, item| {
        item.unit_amount_minor
            .checked_mul(item.quantity as i64)
            .and_then(|line| acc.checked_add(line))
    });
    match total {
        Some(total) if total == amount_minor => Ok(()),
        Some(total) => Err(RelayError::validation(format!(
            "items total ({total}) does not match amount ({amount_minor})"
        ))),
        None => Err(RelayError::validation("items total is out of range")),
    }
}

fn validate_customer(input: &CustomerInput) -> Result<Customer, RelayError> {
    let name = required(input.name.as_ref(), "customer.name")?;
    let email = required(input.email.as_ref(), "customer.email")?;
    let doc = input
        .document
        .as_ref()
        .ok_or_else(|| RelayError::validation("customer.document is required"))?;
    let raw_number = required(doc.number.as_ref(), "customer.document.number")?;
    let digits = document::digits_only(&raw_number);

    let kind = match non_empty(doc.kind.as_ref()) {
        Some(raw) => DocumentKind::parse(&raw).ok_or_else(|| {
            RelayError::validation("customer.document.type must be CPF or CNPJ")
        })?,
        None => DocumentKind::infer(&digits).ok_or_else(|| {
            RelayError::validation("customer.document.type is required")
        })?,
    };

    if !document::is_valid(kind, &digits) {
        return Err(RelayError::validation(format!("customer.document.number is not a valid {kind}")));
    }

    Ok(Customer {
        name,
        email,
        phone: non_empty(input.phone.as_ref()).unwrap_or_default(),
        document: Document { kind, number: digits },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PixMapping {
    Complete,
    Partial,
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixPayload {
    pub qrcode: String,
    pub copy_paste_code: String,
    pub mapping: PixMapping,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub title: String,
}

/// Provider-independent answer to a charge request.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeResponse {
    pub id: String,
    pub status: String,
    /// Minor units (cents).
    pub amount: i64,
    pub pix: PixPayload,
    pub customer: CustomerSummary,
    pub product: ProductSummary,
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> serde_json::Value {
        json!({
            "credentials": {
                "token": "tok_client",
                "name": "Loja",
                "publicKey": "company_1",
                "offer": {"id": "offer-1", "name": "Oferta"},
                "useTax": true
            },
            "amount": 27.8,
            "amountUnit": "reais",
            "customer": {
                "name": "Maria",
                "email": "maria@example.com",
                "phone": "11999999999",
                "document": {"type": "CPF", "number": "529.982.247-25"}
            },
            "product": {"title": "Sandalia"}
        })
    }

    fn parse(v: serde_json::Value) -> CreatePixRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn validates_a_complete_request() {
        let v = validate(&parse(base())).unwrap();
        assert_eq!(v.amount_minor, 2780);
        assert_eq!(v.customer.document.number, "52998224725");
        assert_eq!(
            v.offer,
            OfferLookup::ById {
                id: "offer-1".into(),
                name: Some("Oferta".into())
            }
        );
        assert!(v.use_tax);
        assert_eq!(v.items.len(), 1);
        assert_eq!(v.items[0].unit_amount_minor, 2780);
        assert_eq!(v.product_title(), "Sandalia");
    }

    #[test]
    fn missing_sections_are_validation_errors() {
        for field in ["credentials", "customer", "amount", "amountUnit"] {
            let mut body = base();
            body.as_object_mut().unwrap().remove(field);
            let err = validate(&parse(body)).unwrap_err();
            assert!(matches!(err, RelayError::Validation(ref m) if m.contains(field)), "{field}: {err}");
        }

        let mut body = base();
        body.as_object_mut().unwrap().remove("product");
        assert!(matches!(validate(&parse(body)), Err(RelayError::Validation(_))));

        let mut body = base();
        body["credentials"]["token"] = json!("  ");
        assert!(matches!(validate(&parse(body)), Err(RelayError::Validation(_))));
    }

    #[test]
    fn cents_must_be_integral() {
        let mut body = base();
        body["amountUnit"] = json!("cents");
        assert!(validate(&parse(body.clone())).is_err());
        body["amount"] = json!(2780);
        assert_eq!(validate(&parse(body)).unwrap().amount_minor, 2780);
    }

    #[test]
    fn rejects_invalid_document_before_any_call() {
        let mut body = base();
        body["customer"]["document"]["number"] = json!("123.456.789-00");
        let err = validate(&parse(body)).unwrap_err();
        assert!(err.to_string().contains("CPF"));
    }

    #[test]
    fn items_take_prices_in_declared_unit() {
        let mut body = base();
        body.as_object_mut().unwrap().remove("product");
        body["items"] = json!([
            {"name": "Kit", "price": 10.5, "quantity": 2},
            {"title": "Frete", "unitPrice": 6.8, "tangible": false}
        ]);
        let v = validate(&parse(body)).unwrap();
        assert_eq!(v.items[0].title, "Kit");
        assert_eq!(v.items[0].unit_amount_minor, 1050);
        assert_eq!(v.items[0].quantity, 2);
        assert_eq!(v.items[1].unit_amount_minor, 680);
        assert!(!v.items[1].tangible);
        assert_eq!(v.description, "Kit");
    }

    #[test]
    fn items_must_add_up_to_the_amount() {
        let mut body = base();
        body["amount"] = json!(10000);
        body["amountUnit"] = json!("cents");
        body["items"] = json!([{"title": "Kit", "unitPrice": 500, "quantity": 1}]);
        let err = validate(&parse(body.clone())).unwrap_err();
        assert!(
            matches!(err, RelayError::Validation(ref m) if m.contains("items total (500)")),
            "{err}"
        );

        body["items"] = json!([{"title": "Kit", "unitPrice": 500, "quantity": 20}]);
        assert_eq!(validate(&parse(body)).unwrap().items[0].quantity, 20);
    }

    #[test]
    fn overflowing_items_total_is_rejected() {
        let mut body = base();
        body["amount"] = json!(1000);
        body["amountUnit"] = json!("cents");
        body["items"] = json!([{"title": "Kit", "unitPrice": 4.0e18, "quantity": 4}]);
        let err = validate(&parse(body)).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn offer_falls_back_to_name_then_default() {
        let mut body = base();
        body["credentials"]["offer"] = json!({"name": "Crocs"});
        assert_eq!(validate(&parse(body.clone())).unwrap().offer, OfferLookup::ByName("Crocs".into()));

        body["credentials"].as_object_mut().unwrap().remove("offer");
        assert_eq!(
            validate(&parse(body)).unwrap().offer,
            OfferLookup::ByName(DEFAULT_OFFER_NAME.into())
        );
    }

    #[test]
    fn pix_payload_serializes_camel_case() {
        let pix = PixPayload {
            qrcode: String::new(),
            copy_paste_code: String::new(),
            mapping: PixMapping::Unmapped,
        };
        assert_eq!(
            serde_json::to_value(&pix).unwrap(),
            json!({"qrcode": "", "copyPasteCode": "", "mapping": "unmapped"})
        );
    }
}
