pub mod http_client;
pub mod portal;
pub mod types;

pub use http_client::{HttpClient, ReqwestHttpClient, SimpleHttpResponse};
pub use portal::PortalApi;
pub use types::{
    DashboardStats, Invoice, InvoiceList, RecentInvoice, SupplierAccount, SupplierList,
    SupplierProfile,
};
