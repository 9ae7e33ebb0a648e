//! Orders: one certificate request covering one or more identifiers.
//!
//! An order moves from `pending` to `ready` once every authorization is valid,
//! then through `processing` to `valid` after the CSR is submitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifier::Identifier;
use crate::protocol::errors::AcmeErrorDocument;
use crate::protocol::{Base64Data, Url};

/// One page of the orders known to the provider for an account.
///
/// Further pages are advertised with a `Link: rel="next"` header.
#[derive(Debug, Serialize, Deserialize)]
pub struct Orders {
    /// Order URLs on this page.
    #[serde(default)]
    pub orders: Vec<Url>,
}

/// An order resource as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    status: OrderStatus,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
    identifiers: Vec<Identifier>,
    #[serde(default)]
    not_before: Option<DateTime<Utc>>,
    #[serde(default)]
    not_after: Option<DateTime<Utc>>,
    #[serde(default)]
    error: Option<AcmeErrorDocument>,
    #[serde(default)]
    authorizations: Vec<Url>,
    #[serde(default)]
    finalize: Option<Url>,
    #[serde(default)]
    certificate: Option<Url>,
}

impl Order {
    /// Current state.
    pub fn status(&self) -> &OrderStatus {
        &self.status
    }

    /// After this the provider discards the order.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// Identifiers the certificate will cover.
    pub fn identifiers(&self) -> &[Identifier] {
        self.identifiers.as_ref()
    }

    /// Requested `notBefore` of the certificate.
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// Requested `notAfter` of the certificate.
    pub fn not_after(&self) -> Option<DateTime<Utc>> {
        self.not_after
    }

    /// Problem document explaining an invalid order.
    pub fn error(&self) -> Option<&AcmeErrorDocument> {
        self.error.as_ref()
    }

    /// Authorization URLs, or empty when the provider omits the list.
    pub fn authorizations(&self) -> &[Url] {
        self.authorizations.as_ref()
    }

    /// Where the CSR is posted.
    pub fn finalize(&self) -> Option<&Url> {
        self.finalize.as_ref()
    }

    /// Download location, present once the order is valid.
    pub fn certificate(&self) -> Option<&Url> {
        self.certificate.as_ref()
    }
}

/// Order lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Some authorizations are still outstanding.
    Pending,
    /// All authorizations are valid; waiting for a CSR.
    Ready,
    /// CSR received, certificate not issued yet.
    Processing,
    /// Certificate issued.
    Valid,
    /// Failed. See [`Order::error`].
    Invalid,
}

impl OrderStatus {
    /// Whether the order has left the `pending` and `processing` states.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            OrderStatus::Ready | OrderStatus::Valid | OrderStatus::Invalid
        )
    }
}

/// Payload for the `newOrder` endpoint. The account is implied by the `kid`
/// of the signed request.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    /// At least one identifier is required.
    pub identifiers: Vec<Identifier>,

    /// Requested start of validity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Requested end of validity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,
}

/// Payload for an order's finalize URL.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeOrder {
    csr: Base64Data<Vec<u8>>,
}

impl FinalizeOrder {
    /// Wrap a DER encoded certificate signing request.
    ///
    /// The key which signed the request **must** not be the key used to identify
    /// the ACME account.
    pub fn new(csr_der: &[u8]) -> Self {
        FinalizeOrder {
            csr: Base64Data(csr_der.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_list() {
        let response = crate::response!("orders-page-1.http");
        let orders: Orders = serde_json::from_str(response.body()).unwrap();
        assert_eq!(orders.orders.len(), 2);
    }

    #[test]
    fn order() {
        let response = crate::response!("order-valid.http");
        let order: Order = serde_json::from_str(response.body()).unwrap();
        assert_eq!(order.status(), &OrderStatus::Valid);
        assert_eq!(
            order.certificate(),
            Some(&"https://example.com/acme/cert/mAt3xBGaobw".parse().unwrap())
        );
        assert_eq!(order.authorizations().len(), 2);
        assert_eq!(
            order.identifiers(),
            &[
                Identifier::dns("www.example.org"),
                Identifier::dns("example.org")
            ]
        );
    }

    #[test]
    fn order_without_authorizations() {
        let response = crate::response!("order-no-authorizations.http");
        let order: Order = serde_json::from_str(response.body()).unwrap();
        assert!(order.authorizations().is_empty());
        assert!(order.certificate().is_none());
    }

    #[test]
    fn new_order_payload() {
        let request = NewOrderRequest {
            identifiers: vec![Identifier::dns("www.example.org")],
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"identifiers": [{"type": "dns", "value": "www.example.org"}]})
        );

        let finalize = FinalizeOrder::new(&[0x30, 0x82, 0xff]);
        assert_eq!(
            serde_json::to_value(&finalize).unwrap(),
            serde_json::json!({"csr": "MIL_"})
        );
    }
}
