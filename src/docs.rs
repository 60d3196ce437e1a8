use crate::api::attendance::ScanRequest;
use crate::auth::auth::AuthUser;
use crate::clocking::barcode::StoreBarcode;
use crate::clocking::tracker::{LogPage, ScanReceipt};
use crate::model::attendance::{AttendanceLog, ClockAction};
use crate::model::role::Role;
use crate::models::{LoginReqDto, TokenPair};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Store Clock API",
        version = "0.1.0",
        description = r#"
## Store attendance tracking

Staff and store owners clock in and out by scanning the store's daily barcode.

### 🔹 Key Features
- **Barcode clocking**
  - `STORE-<store id>-<yyyyMMdd>` codes, valid on their day and the next
  - Clocking allowed between 06:00 and 21:00 store time
  - Sessions left open past closing time restart with a fresh clock-in
- **Attendance log**
  - Paginated newest-first log per store, delete one or all (owners)

### 🔐 Security
Endpoints under `/api` require a **JWT Bearer** access token from `/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::whoami,

        crate::api::attendance::scan,
        crate::api::attendance::list_logs,
        crate::api::attendance::delete_log,
        crate::api::attendance::delete_all_logs,
        crate::api::attendance::barcode
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            AuthUser,
            Role,
            ScanRequest,
            ScanReceipt,
            AttendanceLog,
            ClockAction,
            LogPage,
            StoreBarcode
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token management"),
        (name = "Attendance", description = "Barcode clocking and attendance log"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
