/*
 * Responsibility
 * - handler が受け取る extractor の公開口
 */
mod principal;

pub use principal::{AuthPrincipal, Principal};
