use std::{fmt, sync::Arc};

use log::{debug, info, warn};
use reqwest::{
    cookie::{CookieStore, Jar},
    Client, ClientBuilder, Url,
};
use serde_json::{Map, Value};

use crate::{
    alias::{Aliases, NativeClaims},
    filter::Filters,
    response::SelectRowsResponse,
    result::QueryResult,
    Error, Result,
};

const SESSION_COOKIE: &str = "JSESSIONID";

/// HTTP client and cookie jar belonging to a single [`Connection`].
pub struct Session {
    client: Client,
    cookies: Arc<Jar>,
    authenticated: bool,
}

impl Session {
    fn new(builder: ClientBuilder) -> Result<Self> {
        let cookies = Arc::new(Jar::default());
        let client = builder.cookie_provider(Arc::clone(&cookies)).build()?;

        Ok(Session {
            client,
            cookies,
            authenticated: false,
        })
    }

    /// Value of the cookie `name` that would be sent to `url`.
    pub fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.cookies.cookies(url)?;
        header.to_str().ok()?.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// One LabKey server, the query it runs and how its columns are presented.
pub struct Connection {
    host: Url,
    email: String,
    password: String,
    project: String,
    schema: String,
    query_name: String,
    columns: Vec<String>,
    aliases: Aliases,
    custom_columns: Map<String, Value>,
    session: Session,
}

#[derive(Default)]
pub struct ConnectionBuilder {
    host: Option<String>,
    email: Option<String>,
    password: Option<String>,
    project: Option<String>,
    schema: Option<String>,
    query_name: Option<String>,
    columns: Vec<String>,
    aliases: Aliases,
    custom_columns: Map<String, Value>,
    http_client: Option<ClientBuilder>,
}

impl ConnectionBuilder {
    pub fn host(&mut self, host: &str) -> &mut Self {
        self.host = Some(host.to_owned());
        self
    }

    pub fn email(&mut self, email: &str) -> &mut Self {
        self.email = Some(email.to_owned());
        self
    }

    pub fn password(&mut self, password: &str) -> &mut Self {
        self.password = Some(password.to_owned());
        self
    }

    pub fn project(&mut self, project: &str) -> &mut Self {
        self.project = Some(project.to_owned());
        self
    }

    pub fn schema(&mut self, schema: &str) -> &mut Self {
        self.schema = Some(schema.to_owned());
        self
    }

    pub fn query_name(&mut self, query_name: &str) -> &mut Self {
        self.query_name = Some(query_name.to_owned());
        self
    }

    pub fn columns<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn aliases(&mut self, aliases: Aliases) -> &mut Self {
        self.aliases = aliases;
        self
    }

    pub fn custom_column(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.custom_columns.insert(name.to_owned(), value.into());
        self
    }

    pub fn custom_columns(&mut self, custom_columns: Map<String, Value>) -> &mut Self {
        self.custom_columns = custom_columns;
        self
    }

    /// Base HTTP client settings (timeouts, proxies, TLS). The cookie jar is
    /// always replaced by the connection's own.
    pub fn http_client(&mut self, client: ClientBuilder) -> &mut Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(&mut self) -> Result<Connection> {
        let host = required(&self.host, "host")?;
        let host = Url::parse(&host)
            .map_err(|e| Error::Config(format!("invalid host `{}`: {}", host, e)))?;

        Ok(Connection {
            host,
            email: required(&self.email, "email")?,
            password: required(&self.password, "password")?,
            project: required(&self.project, "project")?,
            schema: required(&self.schema, "schema")?,
            query_name: required(&self.query_name, "query_name")?,
            columns: self.columns.clone(),
            aliases: self.aliases.clone(),
            custom_columns: self.custom_columns.clone(),
            session: Session::new(self.http_client.take().unwrap_or_else(Client::builder))?,
        })
    }
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| Error::Config(format!("missing required key `{}`", key)))
}

/// Resolves `relative` against `base` the way browsers do: a trailing slash
/// on the base matters and a leading slash replaces its path.
pub fn join_url(base: &Url, relative: &str) -> Result<Url> {
    base.join(relative)
        .map_err(|e| Error::InvalidUrl(format!("{} + {}: {}", base, relative, e)))
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::default()
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn query_name(&self) -> &str {
        &self.query_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }

    pub fn custom_columns(&self) -> &Map<String, Value> {
        &self.custom_columns
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn url(&self, relative: &str) -> Result<Url> {
        join_url(&self.host, relative)
    }

    /// Logs in with the given credentials, or the configured ones, and keeps
    /// the session cookie for later queries.
    pub async fn login(&mut self, email: Option<&str>, password: Option<&str>) -> Result<()> {
        let email = email.unwrap_or(&self.email).to_owned();
        let password = password.unwrap_or(&self.password).to_owned();
        let login_url = self.url("login/login.post")?;

        self.session.authenticated = false;
        info!("Logging in to {} as {}", self.host, email);

        self.session
            .client
            .post(login_url.clone())
            .form(&[("email", email.as_str()), ("password", password.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let cookie = self
            .session
            .cookie(&self.host, SESSION_COOKIE)
            .or_else(|| self.session.cookie(&login_url, SESSION_COOKIE));

        if cookie.is_none() {
            return Err(Error::Auth(format!(
                "{} did not set a {} cookie",
                self.host, SESSION_COOKIE
            )));
        }

        self.session.authenticated = true;
        info!("Logged in to {}", self.host);
        Ok(())
    }

    /// Runs the configured query with `filters` keyed by user-facing column
    /// names. `aliases` are layered over the configured ones for this call.
    pub async fn query(&self, filters: &Filters, aliases: Option<&Aliases>) -> Result<QueryResult> {
        let aliases = match aliases {
            Some(extra) => self.aliases.overlay(extra),
            None => self.aliases.clone(),
        };
        let reverse = aliases.reverse();

        let mut claims = NativeClaims::new();
        let columns = reverse.columns(&self.columns, &mut claims)?;
        let mut params = vec![
            ("schemaName".to_owned(), self.schema.clone()),
            ("query.queryName".to_owned(), self.query_name.clone()),
            ("query.columns".to_owned(), columns.join(",")),
        ];
        for filter in filters.parse()? {
            params.push(filter.to_param(&reverse, &mut claims)?);
        }

        let query_url = self.url(&format!("query/{}/selectRows.api", self.project))?;

        if !self.session.is_authenticated() {
            warn!("Querying {} without a login session", self.host);
        }
        info!("Querying {}.{} on {}", self.schema, self.query_name, self.host);
        debug!("selectRows parameters: {:?}", params);

        let body = self
            .session
            .client
            .get(query_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let response = SelectRowsResponse::from_slice(&body)?;
        let mut result = QueryResult::from_rows(response.rows, response.metadata);
        result.rename_columns(&aliases);
        for (name, value) in &self.custom_columns {
            result.insert_constant(name, value.clone());
        }

        debug!("{} rows from {}", result.len(), self.host);
        Ok(result)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host.as_str())
            .field("email", &self.email)
            .field("project", &self.project)
            .field("schema", &self.schema)
            .field("query_name", &self.query_name)
            .field("columns", &self.columns)
            .field("aliases", &self.aliases)
            .field("custom_columns", &self.custom_columns)
            .field("authenticated", &self.session.authenticated)
            .finish_non_exhaustive()
    }
}

/// Runs the same query against every connection, one after another, and
/// stacks the results.
pub async fn query_all(
    connections: &[Connection],
    filters: &Filters,
    aliases: Option<&Aliases>,
) -> Result<QueryResult> {
    let mut results = Vec::with_capacity(connections.len());
    for connection in connections {
        results.push(connection.query(filters, aliases).await?);
    }
    Ok(QueryResult::concat(results))
}
