//! 用户可见的全部文案（印尼语）与主菜单

use super::markdown::{Markdown, Reply};
use crate::cloudflare::KvNamespace;

/// Zone ID 步骤中表示跳过的关键词（不区分大小写）
pub const SKIP_KEYWORD: &str = "lewati";

/// 列表为空时的文案
pub const NO_WORKERS: &str = "Tidak ada Worker.";
pub const NO_KV: &str = "Tidak ada KV.";

const MENU_ITEMS: &[(&str, &str, &str)] = &[
    ("🚀", "/deploy", "Upload Worker dari GitHub"),
    ("📂", "/buat_kv", "Membuat penyimpanan KV"),
    ("🔗", "/binding", "Hubungkan KV ke Worker"),
    ("🧾", "/list_worker", "Lihat semua Worker"),
    ("🗃️", "/list_kv", "Lihat semua KV"),
    ("🔐", "/logout", "Keluar dari akun Cloudflare"),
];

fn with_menu(md: Markdown) -> Markdown {
    let mut md = md.text("📋 ").bold("Menu Utama").text(":").newline().newline();
    for (icon, command, description) in MENU_ITEMS {
        md = md.line(&format!("{icon} {command} → {description}"));
    }
    md
}

/// /start 与 /menu
pub fn welcome() -> Reply {
    let md = Markdown::new()
        .text("👋 Selamat datang di ")
        .bold("Bot Cloudflare Manager!")
        .newline()
        .newline()
        .line("Ketik /login untuk mulai.")
        .newline();
    Reply::markdown(with_menu(md))
}

pub fn ask_token() -> Reply {
    Reply::markdown(
        Markdown::new()
            .text("🔑 Langkah 1/3 – Masukkan ")
            .bold("API Token")
            .text(" kamu:"),
    )
}

pub fn ask_account_id() -> Reply {
    Reply::markdown(
        Markdown::new()
            .text("🧾 Langkah 2/3 – Masukkan ")
            .bold("Account ID")
            .text(" kamu:"),
    )
}

pub fn ask_zone_id() -> Reply {
    Reply::markdown(
        Markdown::new()
            .text("🌐 Langkah 3/3 – Masukkan ")
            .bold("Zone ID")
            .text(&format!(" (boleh ketik \"{SKIP_KEYWORD}\"):")),
    )
}

pub fn login_done() -> Reply {
    Reply::markdown(with_menu(Markdown::new().line("✅ Login berhasil!").newline()))
}

pub fn logged_out() -> Reply {
    Reply::plain("✅ Kamu sudah logout.")
}

pub fn not_logged_in() -> Reply {
    Reply::plain("❗ Kamu belum login.")
}

pub fn unknown_command() -> Reply {
    Reply::plain("🤔 Perintah tidak dikenal. Ketik /menu untuk melihat daftar perintah.")
}

/// 必填字段为空；KV 名单独提示
pub fn incomplete_input(field: &str) -> Reply {
    match field {
        "storage_name" => Reply::plain("❌ Nama KV tidak boleh kosong."),
        _ => Reply::plain("❌ Data tidak lengkap. Pastikan sudah login dan input benar."),
    }
}

pub fn unexpected_error(detail: &str) -> Reply {
    Reply::markdown(Markdown::new().text("❌ Terjadi error: ").text(detail))
}

// ---- deploy ----

pub fn ask_repo_url() -> Reply {
    Reply::plain("🔗 Kirim link GitHub (public) yang ingin kamu deploy:")
}

pub fn ask_deploy_name() -> Reply {
    Reply::plain("📛 Masukkan nama Worker:")
}

pub fn deploying() -> Reply {
    Reply::plain("🚧 Sedang deploy Worker...")
}

pub fn deploy_busy() -> Reply {
    Reply::plain("⏳ Deploy sebelumnya masih berjalan. Tunggu sampai selesai.")
}

pub fn deploy_ok(worker_name: &str) -> Reply {
    Reply::markdown(
        Markdown::new()
            .text("✅ Worker ")
            .bold(worker_name)
            .text(" berhasil dideploy."),
    )
}

pub fn deploy_failed(detail: &str) -> Reply {
    Reply::markdown(Markdown::new().line("❌ Gagal deploy:").text(detail))
}

// ---- KV ----

pub fn ask_kv_name() -> Reply {
    Reply::plain("📂 Masukkan nama KV Namespace yang ingin dibuat:")
}

pub fn kv_created(namespace: &KvNamespace) -> Reply {
    Reply::markdown(
        Markdown::new()
            .text("✅ KV Namespace ")
            .bold(&namespace.title)
            .line(" berhasil dibuat!")
            .text("ID: ")
            .code(&namespace.id),
    )
}

pub fn kv_failed(detail: &str) -> Reply {
    Reply::markdown(Markdown::new().text("❌ Gagal membuat KV: ").text(detail))
}

// ---- binding ----

pub fn ask_binding_name() -> Reply {
    Reply::plain("🔗 Masukkan nama binding (nama KV di Worker):")
}

pub fn ask_namespace_id() -> Reply {
    Reply::plain("🗂️ Masukkan ID Namespace KV yang ingin di-binding:")
}

pub fn ask_binding_worker() -> Reply {
    Reply::plain("🛠️ Masukkan nama Worker yang ingin di-binding:")
}

pub fn binding_ok(worker_name: &str, binding_name: &str) -> Reply {
    Reply::markdown(
        Markdown::new()
            .text("✅ KV berhasil dibinding ke Worker ")
            .bold(worker_name)
            .text(" dengan nama binding ")
            .bold(binding_name),
    )
}

pub fn binding_failed(detail: &str) -> Reply {
    Reply::markdown(Markdown::new().text("❌ Gagal binding: ").text(detail))
}

// ---- list ----

pub fn worker_list(names: &[&str]) -> Reply {
    let mut md = Markdown::new().bold("🧾 Daftar Worker:").newline();
    if names.is_empty() {
        md = md.text(NO_WORKERS);
    }
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            md = md.newline();
        }
        md = md.text(&format!("• {name}"));
    }
    Reply::markdown(md)
}

pub fn kv_list(namespaces: &[KvNamespace]) -> Reply {
    let mut md = Markdown::new().bold("📂 Daftar KV Namespace:").newline();
    if namespaces.is_empty() {
        md = md.text(NO_KV);
    }
    for (i, ns) in namespaces.iter().enumerate() {
        if i > 0 {
            md = md.newline();
        }
        md = md.text(&format!("• {} ({})", ns.title, ns.id));
    }
    Reply::markdown(md)
}

pub fn list_workers_failed(detail: &str) -> Reply {
    Reply::markdown(
        Markdown::new()
            .text("❌ Gagal mengambil daftar Worker: ")
            .text(detail),
    )
}

pub fn list_kv_failed(detail: &str) -> Reply {
    Reply::markdown(Markdown::new().text("❌ Gagal mengambil daftar KV: ").text(detail))
}
