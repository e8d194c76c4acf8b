use serde::Serialize;
use std::fmt;

/// API versions served
pub const VERSIONS: [&str; 1] = [crate::creds::API_VERSION];

pub const CREDS_PATH: &str = "/v1/creds";
pub const CLOUDSNAP_PATH: &str = "/v1/osd-snapshot/cloudsnap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        };
        f.write_str(verb)
    }
}

/// Logical operation a route is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Versions,
    ListDrivers,
    ListCredentials,
    AddCredential,
    UpdateCredential,
    DeleteCredential,
    RotateCredential,
    CreateSchedule,
    UpdateSchedule,
    ListSchedules,
    DeleteSchedule,
    CloudBackup,
    CachedStatus,
    ChangeBackupState,
    BackupCatalog,
    BackupMetadata,
    CloudRestore,
    ListCloudSnaps,
    DeleteCloudSnaps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub operation: Operation,
}

impl Route {
    fn new(method: Method, path: impl Into<String>, operation: Operation) -> Self {
        Self {
            method,
            path: path.into(),
            operation,
        }
    }
}

/// Every route the control plane serves
pub fn routes() -> Vec<Route> {
    use Method::*;
    use Operation::*;

    let creds = |name: &str| format!("{}/{}", CREDS_PATH, name);
    let cloudsnap = |name: &str| format!("{}/{}", CLOUDSNAP_PATH, name);

    vec![
        Route::new(Get, "/versions", Versions),
        Route::new(Get, "/v1/drivers", ListDrivers),
        Route::new(Get, creds("listcreds"), ListCredentials),
        Route::new(Put, creds("addcreds"), AddCredential),
        Route::new(Post, creds("updatecreds"), UpdateCredential),
        Route::new(Delete, creds("deletecreds"), DeleteCredential),
        Route::new(Post, creds("rotatecreds"), RotateCredential),
        Route::new(Put, cloudsnap("createcloudsnapsched"), CreateSchedule),
        Route::new(Post, cloudsnap("updatecloudsnapsched"), UpdateSchedule),
        Route::new(Get, cloudsnap("listcloudsnapsched"), ListSchedules),
        Route::new(Delete, cloudsnap("deletecloudsnapsched"), DeleteSchedule),
        Route::new(Post, cloudsnap("backup"), CloudBackup),
        Route::new(Get, cloudsnap("cloudsnapstatus"), CachedStatus),
        Route::new(Post, cloudsnap("changestate"), ChangeBackupState),
        Route::new(Get, cloudsnap("getbkupcatalog"), BackupCatalog),
        Route::new(Get, cloudsnap("getbkupmeta"), BackupMetadata),
        Route::new(Post, cloudsnap("restore"), CloudRestore),
        Route::new(Get, cloudsnap("listcloudsnaps"), ListCloudSnaps),
        Route::new(Delete, cloudsnap("deletecloudsnaps"), DeleteCloudSnaps),
    ]
}

/// Match a request line; any query string is ignored
pub fn find_route(method: Method, path: &str) -> Option<Route> {
    let path = path.split('?').next().unwrap_or(path);
    routes()
        .into_iter()
        .find(|route| route.method == method && route.path == path)
}
