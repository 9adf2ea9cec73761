// Runtime configuration (TOML settings + environment secrets)
pub mod config;

// Domain error taxonomy
pub mod error;

// AES-256-GCM token cipher
pub mod crypto;

// Encrypted credential custody
pub mod credentials;

// Microsoft identity platform exchanges
pub mod oauth;

// Authenticated Graph call wrapper
pub mod graph;

// Session token issuing and verification
pub mod session;

// Principal directory seam
pub mod principals;

// HTTP API surface
pub mod api;
