use std::sync::Arc;

use biodata_access::{Operation, PermissionEvaluator, SessionStore};
use serde_json::{Map, Value, json};

use crate::{ApiClient, ApiError, Method, OutboundRequest, Transport, identity_fields};

/// Default mode for value searches; the backend picks exact or fuzzy
/// matching from the input
pub const DEFAULT_SEARCH_MODE: &str = "auto";

/// Whether a SQL statement only reads. Anything that does not start with a
/// read-only keyword is treated as a write.
pub fn statement_operation(sql: &str) -> Operation {
    const READ_ONLY: &[&str] = &["select", "show", "describe", "desc", "explain", "with"];

    let keyword = sql
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if READ_ONLY.contains(&keyword.as_str()) {
        Operation::Read
    } else {
        Operation::Write
    }
}

/// Database browsing, querying and editing endpoints.
///
/// Writes against the restricted data source are checked locally first and
/// refused with [`ApiError::Forbidden`] without a round trip. The backend
/// still makes the final decision for everything that is sent.
#[derive(Debug, Clone)]
pub struct DatabaseApi<T> {
    client: Arc<ApiClient<T>>,
    store: Arc<SessionStore>,
    evaluator: PermissionEvaluator,
}

impl<T: Transport> DatabaseApi<T> {
    /// Endpoints over `client`, checking writes with `evaluator`
    pub fn new(
        client: Arc<ApiClient<T>>,
        store: Arc<SessionStore>,
        evaluator: PermissionEvaluator,
    ) -> Self {
        Self {
            client,
            store,
            evaluator,
        }
    }

    fn authorize(&self, data_source: &str, operation: Operation) -> Result<(), ApiError> {
        if data_source != self.evaluator.restricted_resource() {
            return Ok(());
        }
        self.evaluator
            .evaluate(data_source, operation)
            .into_result()
            .map_err(ApiError::from)
    }

    // Search endpoints are not in the injection allow-list but still expect
    // the caller's identity as query parameters.
    fn identified(&self, request: OutboundRequest) -> OutboundRequest {
        match identity_fields(&self.store.session()) {
            Some((user_id, user_type)) => request
                .with_query("userId", user_id)
                .with_query("userType", user_type),
            None => request,
        }
    }

    /// Data sources the caller can browse
    pub async fn data_sources(&self) -> Result<Value, ApiError> {
        self.client
            .fetch(OutboundRequest::get("/api/database/datasources"))
            .await
    }

    /// Tables of `data_source`
    pub async fn tables(&self, data_source: &str) -> Result<Value, ApiError> {
        self.client
            .fetch(OutboundRequest::get("/api/database/tables").with_query("dataSource", data_source))
            .await
    }

    /// Column metadata of `table`
    pub async fn table_columns(&self, table: &str, data_source: &str) -> Result<Value, ApiError> {
        self.client
            .fetch(
                OutboundRequest::get(format!("/api/database/tables/{table}/columns"))
                    .with_query("dataSource", data_source),
            )
            .await
    }

    /// One page of rows from `table`; pages start at 1
    pub async fn table_page(
        &self,
        table: &str,
        data_source: &str,
        page: u32,
        size: u32,
    ) -> Result<Value, ApiError> {
        self.client
            .fetch(
                OutboundRequest::get(format!("/api/database/tables/{table}/data/page"))
                    .with_query("dataSource", data_source)
                    .with_query("page", page)
                    .with_query("size", size),
            )
            .await
    }

    /// Run `sql` against `data_source`
    pub async fn execute_query(&self, data_source: &str, sql: &str) -> Result<Value, ApiError> {
        self.authorize(data_source, statement_operation(sql))?;
        self.client
            .fetch(OutboundRequest::post(
                "/api/database/query",
                json!({ "dataSource": data_source, "sql": sql }),
            ))
            .await
    }

    /// Tables in `data_source` containing `value`
    pub async fn find_tables_by_value(
        &self,
        value: &str,
        data_source: &str,
        mode: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = OutboundRequest::get("/api/database/search/tables-by-value")
            .with_query("searchValue", value)
            .with_query("dataSource", data_source)
            .with_query("searchMode", mode.unwrap_or(DEFAULT_SEARCH_MODE));
        self.client.fetch(self.identified(request)).await
    }

    /// Rows of `table` containing `value`
    pub async fn rows_by_value(
        &self,
        table: &str,
        value: &str,
        data_source: &str,
        page: u32,
        size: u32,
    ) -> Result<Value, ApiError> {
        let request = OutboundRequest::get("/api/database/search/data-by-value")
            .with_query("tableName", table)
            .with_query("searchValue", value)
            .with_query("dataSource", data_source)
            .with_query("page", page)
            .with_query("size", size);
        self.client.fetch(self.identified(request)).await
    }

    /// Insert `row` into `table`
    pub async fn insert_row(
        &self,
        table: &str,
        data_source: &str,
        row: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        self.authorize(data_source, Operation::Write)?;
        self.client
            .fetch(OutboundRequest::post(
                format!("/api/database/tables/{table}/data"),
                json!({ "dataSource": data_source, "data": row }),
            ))
            .await
    }

    /// Update the rows of `table` matching `filter` with `row`
    pub async fn update_rows(
        &self,
        table: &str,
        data_source: &str,
        row: Map<String, Value>,
        filter: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        self.authorize(data_source, Operation::Write)?;
        self.client
            .fetch(OutboundRequest::put(
                format!("/api/database/tables/{table}/data"),
                json!({ "dataSource": data_source, "data": row, "where": filter }),
            ))
            .await
    }

    /// Delete the rows of `table` matching `filter`
    pub async fn delete_rows(
        &self,
        table: &str,
        data_source: &str,
        filter: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        self.authorize(data_source, Operation::Write)?;
        self.client
            .fetch(
                OutboundRequest::delete(format!("/api/database/tables/{table}/data"))
                    .with_body(json!({ "dataSource": data_source, "where": filter })),
            )
            .await
    }

    /// Drop cached search results, for one data source or all of them
    pub async fn clear_search_cache(&self, data_source: Option<&str>) -> Result<Value, ApiError> {
        self.client
            .fetch(OutboundRequest::post(
                "/api/database/cache/clear",
                json!({ "dataSource": data_source }),
            ))
            .await
    }

    /// Search cache statistics
    pub async fn search_cache_stats(&self) -> Result<Value, ApiError> {
        let request = OutboundRequest::get("/api/database/cache/stats");
        self.client.fetch(self.identified(request)).await
    }
}

/// Administration of internal users and their write grants.
///
/// Every call requires an administrator session and carries the caller's
/// identifier as `adminId`.
#[derive(Debug, Clone)]
pub struct PermissionApi<T> {
    client: Arc<ApiClient<T>>,
    store: Arc<SessionStore>,
}

impl<T: Transport> PermissionApi<T> {
    /// Endpoints over `client`
    pub fn new(client: Arc<ApiClient<T>>, store: Arc<SessionStore>) -> Self {
        Self { client, store }
    }

    fn admin_id(&self) -> Result<Value, ApiError> {
        let session = self.store.session();
        match (&session.user_id, session.is_admin()) {
            (Some(user_id), true) => Ok(user_id.coerce().to_json()),
            _ => Err(ApiError::Forbidden {
                reason: "administrator access required".into(),
            }),
        }
    }

    async fn admin_get(&self, path: String) -> Result<Value, ApiError> {
        let admin_id = self.admin_id()?;
        self.client
            .fetch(OutboundRequest::get(path).with_query("adminId", admin_id))
            .await
    }

    async fn admin_send(
        &self,
        request: OutboundRequest,
        mut grant: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        grant.insert("adminId".into(), self.admin_id()?);
        self.client
            .fetch(request.with_body(Value::Object(grant)))
            .await
    }

    /// Grant write access to a whole database
    pub async fn grant_database_write(&self, grant: Map<String, Value>) -> Result<Value, ApiError> {
        self.admin_send(
            OutboundRequest::new(Method::Post, "/api/admin/permissions/grant-database"),
            grant,
        )
        .await
    }

    /// Revoke write access to a whole database
    pub async fn revoke_database_write(&self, grant: Map<String, Value>) -> Result<Value, ApiError> {
        self.admin_send(
            OutboundRequest::delete("/api/admin/permissions/revoke-database"),
            grant,
        )
        .await
    }

    /// Grant write access to a table
    pub async fn grant_table_write(&self, grant: Map<String, Value>) -> Result<Value, ApiError> {
        self.admin_send(
            OutboundRequest::new(Method::Post, "/api/admin/permissions/grant"),
            grant,
        )
        .await
    }

    /// Revoke write access to a table
    pub async fn revoke_table_write(&self, grant: Map<String, Value>) -> Result<Value, ApiError> {
        self.admin_send(
            OutboundRequest::new(Method::Post, "/api/admin/permissions/revoke"),
            grant,
        )
        .await
    }

    /// Every recorded grant
    pub async fn all_permissions(&self) -> Result<Value, ApiError> {
        self.admin_get("/api/admin/permissions/all".into()).await
    }

    /// Grants held by one internal user
    pub async fn user_permissions(&self, internal_user_id: i64) -> Result<Value, ApiError> {
        self.admin_get(format!("/api/admin/permissions/user/{internal_user_id}"))
            .await
    }

    /// Create an internal user
    pub async fn create_internal_user(&self, user: Map<String, Value>) -> Result<Value, ApiError> {
        self.admin_send(
            OutboundRequest::new(
                Method::Post,
                "/api/admin/permissions/create-internal-user",
            ),
            user,
        )
        .await
    }

    /// All internal users
    pub async fn internal_users(&self) -> Result<Value, ApiError> {
        self.admin_get("/api/admin/permissions/internal-users".into())
            .await
    }
}
