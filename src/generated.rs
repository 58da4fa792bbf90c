#![allow(
    clippy::doc_markdown,
    clippy::use_self,
    clippy::enum_variant_names,
    clippy::large_enum_variant
)]

pub mod envoy {
    pub mod config {
        pub mod core {
            pub mod v3;
        }
    }
    pub mod service {
        pub mod auth {
            pub mod v3;
        }
    }
    pub mod r#type {
        pub mod v3;
    }
}

pub mod google {
    pub mod rpc;
}
