//! Wire copy shown to mobile and web clients

pub const SUCCESS_INSERT: &str = "Data berhasil ditambahkan.";
pub const SUCCESS_UPDATE: &str = "Data berhasil diperbarui.";
pub const SUCCESS_DELETE: &str = "Data berhasil dihapus.";
pub const SUCCESS_GET_DATA: &str = "Data berhasil diambil.";
pub const SUCCESS_LOGIN: &str = "Berhasil masuk.";

pub const ERROR_VALIDATION: &str = "Data yang diberikan tidak valid.";
pub const ERROR_NOT_FOUND: &str = "Data tidak ditemukan.";
pub const ERROR_INTERNAL_SERVER: &str = "Terjadi kesalahan pada server.";
pub const ERROR_SERVICE_UNAVAILABLE: &str = "Layanan sedang tidak tersedia, silakan coba lagi.";

pub const ERROR_INVALID_LOGIN: &str = "Email atau kata sandi salah.";
pub const ERROR_UNAUTHORIZED: &str = "Akses tidak diizinkan.";
pub const ERROR_ACCOUNT_EXISTS: &str = "Akun dengan email tersebut sudah terdaftar.";
pub const ERROR_TOKEN_MISSING: &str = "Token tidak ditemukan";
pub const ERROR_TOKEN_INVALID: &str = "Token tidak valid";

pub const RULE_DELETE_NOT_PENDING: &str = "tidak dapat dihapus karena statusnya bukan diproses";
pub const RULE_UPDATE_NOT_PENDING: &str = "tidak dapat diperbarui karena statusnya bukan diproses";
pub const ERROR_PAYLOAD_TOO_LARGE: &str = "Ukuran data melebihi batas yang diizinkan.";
