/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: bearer 検証 (protected routes のみ)
 * - http / cors / security_headers: Router 全体に掛ける横断処理
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
