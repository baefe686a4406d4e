use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Invoice statuses the portal understands.
pub const INVOICE_STATUSES: [&str; 4] = ["Recibida", "Por Pagar", "Pagada", "Vencida"];

/// An uploaded invoice as returned by the backend. Extraction output
/// varies per document, so unknown fields are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "invoiceId", default)]
    pub invoice_id: String,
    #[serde(rename = "supplierUid", default)]
    pub supplier_uid: Option<String>,
    /// Present only in admin listings.
    #[serde(rename = "supplierEmail", default)]
    pub supplier_email: Option<String>,
    #[serde(rename = "supplierRuc", default)]
    pub supplier_ruc: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub processed: Option<bool>,
    #[serde(default)]
    pub monto_total: Option<String>,
    #[serde(default)]
    pub moneda: Option<String>,
    #[serde(default)]
    pub ruc_emisor: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "processedAt", default)]
    pub processed_at: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Response of `GET /invoices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceList {
    pub items: Vec<Invoice>,
    pub total: u64,
}

/// Supplier profile fields kept by the portal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierProfile {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub ruc: Option<String>,
    #[serde(rename = "razonSocial", default)]
    pub razon_social: Option<String>,
    #[serde(rename = "representanteLegal", default)]
    pub representante_legal: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A registered supplier account as listed for administrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierAccount {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub profile: Option<SupplierProfile>,
}

/// Response of `GET /suppliers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierList {
    pub suppliers: Vec<SupplierAccount>,
    pub total: u64,
}

/// A compact invoice reference inside the dashboard stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentInvoice {
    #[serde(rename = "invoiceId", default)]
    pub invoice_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub monto_total: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

/// Response of `GET /dashboard/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_invoices: u64,
    #[serde(default)]
    pub by_status: HashMap<String, u64>,
    #[serde(default)]
    pub processed_count: u64,
    #[serde(default)]
    pub total_suppliers: u64,
    #[serde(default)]
    pub recent_invoices: Vec<RecentInvoice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_deserializes_backend_shape() {
        let raw = serde_json::json!({
            "invoiceId": "inv-1",
            "supplierUid": "uid-1",
            "status": "Por Pagar",
            "processed": true,
            "monto_total": "1500.00",
            "moneda": "PEN",
            "ruc_emisor": "20123456789",
            "createdAt": "2025-04-01T12:00:00Z",
            "fecha_emision": "2025-03-28"
        });

        let invoice: Invoice = serde_json::from_value(raw).unwrap();
        assert_eq!(invoice.invoice_id, "inv-1");
        assert_eq!(invoice.status.as_deref(), Some("Por Pagar"));
        assert_eq!(invoice.monto_total.as_deref(), Some("1500.00"));
        // Extraction fields we don't model are preserved.
        assert_eq!(invoice.extra["fecha_emision"], "2025-03-28");
    }

    #[test]
    fn dashboard_stats_deserializes_backend_shape() {
        let raw = serde_json::json!({
            "total_invoices": 3,
            "by_status": {"Recibida": 1, "Pagada": 2},
            "processed_count": 2,
            "total_suppliers": 2,
            "recent_invoices": [
                {"invoiceId": "inv-9", "status": "Pagada", "monto_total": "10.00", "createdAt": null}
            ]
        });

        let stats: DashboardStats = serde_json::from_value(raw).unwrap();
        assert_eq!(stats.total_invoices, 3);
        assert_eq!(stats.by_status["Pagada"], 2);
        assert_eq!(stats.recent_invoices.len(), 1);
        assert_eq!(stats.recent_invoices[0].invoice_id, "inv-9");
    }
}
