#![allow(dead_code)]

pub mod fixtures {
    use brrtbind::signature::RequestType;
    use brrtbind::Schema;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schema)]
    pub struct UserInfoModel {
        pub user_id: i64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schema)]
    pub struct TagQuery {
        pub tag: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schema)]
    pub struct SearchQuery {
        #[schema(min_length = 1)]
        pub q: String,
        pub page: Option<u32>,
        pub tags: Option<Vec<String>>,
        pub active: Option<bool>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schema)]
    pub struct LoginForm {
        #[schema(min_length = 3, max_length = 32)]
        pub username: String,
        #[serde(default)]
        pub remember: bool,
    }

    /// Composite request type that pre-declares json and query slots.
    pub fn user_request() -> RequestType {
        RequestType::composite("UserRequest")
            .json::<UserInfoModel>()
            .query::<TagQuery>()
    }
}

pub mod tracing_init {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Route `tracing` output through the test harness so it shows on failure.
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("brrtbind=debug")
                .with_test_writer()
                .try_init();
        });
    }
}
