/* Flow
    - Load connections from a YAML file (default section + servers) OK
    - Log in to each server, keep JSESSIONID in the connection's jar OK
    - Query with user-facing column names & filters OK
        - translate names to server columns OK
        - rename result columns back, add custom columns OK
    - Stack results from every server OK
*/

pub mod alias;
pub mod config;
pub mod connection;
mod error;
pub mod filter;
pub mod response;
pub mod result;

pub use alias::{Aliases, NativeClaims, ReverseAliases};
pub use config::{load_connections, ConfigFile, ServerConfig};
pub use connection::{join_url, query_all, Connection, ConnectionBuilder, Session};
pub use error::{Error, Result};
pub use filter::{Filter, Filters};
pub use result::{QueryResult, Row};
