//! Notification phrasing.
//!
//! Notification text is drawn from a per-category bank of templates so
//! the companion device doesn't repeat itself word for word. The bank is
//! seeded once into `message_templates`; custom phrasings can be added
//! at runtime and duplicates are ignored. Selection is uniform, done in
//! the storage layer.

use rusqlite::params;

use crate::error::Result;
use crate::ledger::NotificationCategory;
use crate::storage::Database;

/// Fallback when a category has no templates at all.
const DEFAULT_MESSAGE: &str = "がんばって！";

const BUILTIN_TEMPLATES: &[(NotificationCategory, &str)] = &[
    (
        NotificationCategory::SaboriReminder,
        "そろそろ{project_name}やったほうがよいんじゃない？",
    ),
    (
        NotificationCategory::SaboriReminder,
        "{project_name}、今日はまだだよね？始めようか！",
    ),
    (
        NotificationCategory::SaboriReminder,
        "いつもの時間だよ！{project_name}、やる？",
    ),
    (
        NotificationCategory::SaboriReminder,
        "{project_name}の時間だよ～！準備はいい？",
    ),
    (
        NotificationCategory::SaboriReminder,
        "あれ、{project_name}忘れてない？大丈夫？",
    ),
    (
        NotificationCategory::SaboriReminder,
        "{project_name}、そろそろ始める時間だと思うんだけど...",
    ),
    (
        NotificationCategory::SaboriReminder,
        "今日も{project_name}、がんばろうね！",
    ),
    (
        NotificationCategory::SaboriReminder,
        "{project_name}のこと、覚えてる？そろそろだよ！",
    ),
    (
        NotificationCategory::EarlyStart,
        "あれ、今日は朝やるんだ！がんばって！",
    ),
    (
        NotificationCategory::EarlyStart,
        "おはよう！今日は早いね。応援してるよ！",
    ),
    (
        NotificationCategory::EarlyStart,
        "朝活いいね！{project_name}、ファイト！",
    ),
    (
        NotificationCategory::EarlyStart,
        "いつもより早いね！すごい、頑張ってね！",
    ),
    (
        NotificationCategory::EarlyStart,
        "早起きえらい！今日もいい一日になりそうだね！",
    ),
    (
        NotificationCategory::EarlyStart,
        "わあ、朝から{project_name}！やる気満々だね！",
    ),
    (
        NotificationCategory::EarlyStart,
        "おはよう！朝から{project_name}、素敵だね！",
    ),
    (
        NotificationCategory::LateWork,
        "今日は夜やるんだね！無理しないでね！",
    ),
    (
        NotificationCategory::LateWork,
        "夜型になってるね。体調には気をつけて！",
    ),
    (
        NotificationCategory::LateWork,
        "遅い時間だけど、がんばってね！",
    ),
    (
        NotificationCategory::LateWork,
        "いつもと違う時間だね。集中できてる？",
    ),
    (
        NotificationCategory::LateWork,
        "夜の{project_name}もいいね。無理は禁物だよ！",
    ),
    (
        NotificationCategory::LateWork,
        "こんな時間に{project_name}！締め切り近いのかな？",
    ),
    (
        NotificationCategory::DeepNightPraise,
        "こんな時間までお疲れさま！もう少しだね！",
    ),
    (
        NotificationCategory::DeepNightPraise,
        "夜遅くまでがんばったね！ゆっくり休んでね！",
    ),
    (
        NotificationCategory::DeepNightPraise,
        "お疲れさま！今日も一日よくがんばったね！",
    ),
    (
        NotificationCategory::DeepNightPraise,
        "深夜までお疲れさま！無理しすぎないでね！",
    ),
    (
        NotificationCategory::DeepNightPraise,
        "すごい集中力！でもそろそろ休もう？",
    ),
    (
        NotificationCategory::DeepNightPraise,
        "今日も一日お疲れさま！ゆっくり休んでね！",
    ),
    (
        NotificationCategory::DeepNightPraise,
        "{project_name}、こんな時間まで！本当にお疲れさま！",
    ),
    (
        NotificationCategory::DeepNightPraise,
        "深夜の作業、お疲れさま！明日もがんばろうね！",
    ),
];

/// Per-category phrase bank backed by `message_templates`.
pub struct MessageCatalog;

impl MessageCatalog {
    /// Seed the built-in bank. Safe to call repeatedly.
    pub fn install_defaults(db: &Database) -> Result<()> {
        for (category, template) in BUILTIN_TEMPLATES {
            Self::add(db, *category, template)?;
        }
        Ok(())
    }

    /// Add one template; an exact duplicate within the category is a no-op.
    pub fn add(db: &Database, category: NotificationCategory, template: &str) -> Result<()> {
        db.conn().execute(
            "INSERT OR IGNORE INTO message_templates (category, message_template)
             VALUES (?1, ?2)",
            params![category.as_str(), template],
        )?;
        Ok(())
    }

    /// Pick one template for the category uniformly at random and fill in
    /// the project name. Unknown placeholders stay as-is; a category with
    /// no templates falls back to a generic cheer.
    pub fn random_message(
        db: &Database,
        category: NotificationCategory,
        project_name: &str,
    ) -> Result<String> {
        let template: Option<String> = db
            .conn()
            .query_row(
                "SELECT message_template FROM message_templates
                 WHERE category = ?1
                 ORDER BY RANDOM()
                 LIMIT 1",
                params![category.as_str()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(crate::error::DatabaseError::from(other)),
            })?;

        Ok(match template {
            Some(template) => render(&template, project_name),
            None => DEFAULT_MESSAGE.to_string(),
        })
    }
}

fn render(template: &str, project_name: &str) -> String {
    template.replace("{project_name}", project_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_is_idempotent() {
        let db = Database::open_memory().unwrap();
        MessageCatalog::install_defaults(&db).unwrap();
        MessageCatalog::install_defaults(&db).unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM message_templates", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, BUILTIN_TEMPLATES.len() as i64);
    }

    #[test]
    fn substitutes_project_name() {
        let db = Database::open_memory().unwrap();
        MessageCatalog::add(
            &db,
            NotificationCategory::SaboriReminder,
            "時間だよ、{project_name}！",
        )
        .unwrap();

        let message =
            MessageCatalog::random_message(&db, NotificationCategory::SaboriReminder, "論文")
                .unwrap();
        assert_eq!(message, "時間だよ、論文！");
    }

    #[test]
    fn unknown_placeholder_survives() {
        let db = Database::open_memory().unwrap();
        MessageCatalog::add(
            &db,
            NotificationCategory::LateWork,
            "{project_name} for {duration} min",
        )
        .unwrap();

        let message =
            MessageCatalog::random_message(&db, NotificationCategory::LateWork, "p").unwrap();
        assert_eq!(message, "p for {duration} min");
    }

    #[test]
    fn empty_category_falls_back() {
        let db = Database::open_memory().unwrap();
        let message =
            MessageCatalog::random_message(&db, NotificationCategory::EarlyStart, "p").unwrap();
        assert_eq!(message, DEFAULT_MESSAGE);
    }

    #[test]
    fn every_builtin_category_is_covered() {
        let db = Database::open_memory().unwrap();
        MessageCatalog::install_defaults(&db).unwrap();
        for category in [
            NotificationCategory::SaboriReminder,
            NotificationCategory::EarlyStart,
            NotificationCategory::LateWork,
            NotificationCategory::DeepNightPraise,
        ] {
            let message = MessageCatalog::random_message(&db, category, "p").unwrap();
            assert_ne!(message, DEFAULT_MESSAGE);
        }
    }
}
