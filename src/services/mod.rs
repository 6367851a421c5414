pub mod connection_store;
pub mod mercadopago;
pub mod oauth_state;
pub mod providers;

pub use connection_store::{ConnectionStore, MemoryConnectionStore, SupabaseConnectionStore};
pub use mercadopago::{MercadoPagoClient, ProviderError};
pub use oauth_state::{OAuthState, StateSigner};
pub use providers::{ClipProvider, MercadoPagoProvider, PaymentProvider, ProviderRegistry};
