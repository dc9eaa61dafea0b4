//! Offline administration against the bot's database.

use {
    joingate_gate::{ApprovalStore, ChatRecord, ConfigStore, UserId},
    serde::Serialize,
};

/// Everything stored for one administrator.
#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub admin_id: UserId,
    pub approved: bool,
    pub groups: Vec<ChatRecord>,
    pub channels: Vec<ChatRecord>,
}

/// Mark `admin` approved without notifying anyone.
pub async fn approve<S>(store: &S, admin: UserId) -> anyhow::Result<()>
where
    S: ApprovalStore,
{
    store.set_approved(admin).await?;
    println!("User {admin} approved.");
    Ok(())
}

pub async fn show<S>(store: &S, admin: UserId, json: bool) -> anyhow::Result<()>
where
    S: ApprovalStore + ConfigStore,
{
    let summary = load_summary(store, admin).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

pub async fn load_summary<S>(store: &S, admin: UserId) -> anyhow::Result<AdminSummary>
where
    S: ApprovalStore + ConfigStore,
{
    Ok(AdminSummary {
        admin_id: admin,
        approved: store.is_approved(admin).await?,
        groups: store.list_groups(admin).await?,
        channels: store.list_channels(admin).await?,
    })
}

pub fn render_summary(summary: &AdminSummary) -> String {
    let mut out = format!(
        "Admin {}: {}\n",
        summary.admin_id,
        if summary.approved {
            "approved"
        } else {
            "not approved"
        }
    );
    for (label, records) in [("Groups", &summary.groups), ("Channels", &summary.channels)] {
        out.push_str(&format!("{label} ({}):\n", records.len()));
        if records.is_empty() {
            out.push_str("  (none)\n");
        }
        for record in records {
            out.push_str(&format!("  {} {}\n", record.chat_id, record.link));
        }
    }
    out
}
