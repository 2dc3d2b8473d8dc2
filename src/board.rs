//! Server-rendered departure board. The page reloads itself every
//! [`REFRESH_SECS`] and keeps the hidden groups in its own URL, so a
//! reload or a shared link shows the same selection.

use std::sync::RwLock;

use actix_web::{http::header::ContentType, web, HttpResponse};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    lines::LineSource,
    next_trains::StopMonitoringSource,
    trains::{ArrivalSlot, ArrivalStatus, TrainGroup},
    ContextData,
};

/// Query parameter carrying the ignored group ids
pub const IGNORE_PARAM: &str = "ignoreGares";
const IGNORE_SEPARATOR: &str = "_";

pub const REFRESH_SECS: u32 = 10;

#[derive(Deserialize)]
pub struct BoardQuery {
    #[serde(rename = "ignoreGares")]
    ignore: Option<String>,
}

/// Last groups fetched successfully, shown when a refresh fails
#[derive(Default)]
pub struct Snapshot(RwLock<Vec<TrainGroup>>);

impl Snapshot {
    pub fn store(&self, groups: &[TrainGroup]) {
        if let Ok(mut snapshot) = self.0.write() {
            *snapshot = groups.to_vec();
        }
    }

    pub fn load(&self) -> Vec<TrainGroup> {
        self.0.read().map(|s| s.clone()).unwrap_or_default()
    }
}

pub fn parse_ignore_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(IGNORE_SEPARATOR)
        .filter(|id| !id.is_empty())
        .unique()
        .map(str::to_string)
        .collect()
}

pub fn format_ignore_list(ignored: &[String]) -> Option<String> {
    if ignored.is_empty() {
        None
    } else {
        Some(ignored.join(IGNORE_SEPARATOR))
    }
}

/// Adds `id` if absent, removes it otherwise
pub fn toggle_ignored(ignored: &[String], id: &str) -> Vec<String> {
    if ignored.iter().any(|i| i == id) {
        ignored.iter().filter(|i| *i != id).cloned().collect()
    } else {
        ignored.iter().cloned().chain([id.to_string()]).collect()
    }
}

pub fn filter_ignored<'a>(groups: &'a [TrainGroup], ignored: &[String]) -> Vec<&'a TrainGroup> {
    groups
        .iter()
        .filter(|g| !ignored.contains(&g.id))
        .collect()
}

/// Whole minutes until arrival, rounded down
pub fn countdown_minutes(expected: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expected - now).num_milliseconds().div_euclid(60_000)
}

pub fn status_color(status: ArrivalStatus) -> &'static str {
    match status {
        ArrivalStatus::OnTime | ArrivalStatus::Early => "white",
        ArrivalStatus::Delayed => "orange",
        ArrivalStatus::Cancelled | ArrivalStatus::Missed => "red",
        _ => "gray",
    }
}

pub fn board_href(ignored: &[String]) -> String {
    match format_ignore_list(ignored) {
        Some(value) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair(IGNORE_PARAM, &value)
                .finish();
            format!("/?{}", query)
        }
        None => "/".to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_slot(slot: &ArrivalSlot, now: DateTime<Utc>) -> String {
    format!(
        r#"<div class="horaires"><div class="trestant" style="color: {}">{}</div><div class="voie">{}</div></div>"#,
        status_color(slot.status),
        countdown_minutes(slot.expected_arrival_time, now),
        escape(slot.platform.as_deref().unwrap_or_default()),
    )
}

fn render_card(group: &TrainGroup, now: DateTime<Utc>) -> String {
    let picto = match &group.line.picto {
        Some(url) => format!(
            r#"<img class="picto" src="{}" alt="{}">"#,
            escape(url),
            escape(&group.line.name)
        ),
        None => format!(r#"<div class="picto">{}</div>"#, escape(&group.line.name)),
    };
    let slots: String = group.slots.iter().map(|s| render_slot(s, now)).collect();

    format!(
        r#"<div class="carte" id="{}">{}<div class="destination">{}</div>{}</div>"#,
        escape(&group.id),
        picto,
        escape(&group.destination_name),
        slots,
    )
}

fn render_filters(groups: &[TrainGroup], ignored: &[String]) -> String {
    let buttons: String = groups
        .iter()
        .map(|g| (format!("{} → {}", g.line.name, g.destination_name), g))
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .unique_by(|(_, g)| g.id.clone())
        .map(|(label, g)| {
            let class = if ignored.contains(&g.id) {
                "gare-btn gare-btn--active"
            } else {
                "gare-btn"
            };
            format!(
                r#"<a class="{}" href="{}">{}</a>"#,
                class,
                escape(&board_href(&toggle_ignored(ignored, &g.id))),
                escape(&label),
            )
        })
        .collect();

    format!(
        r#"<details class="changes"><summary>Filtres</summary><p>Liste des lignes à ignorer</p><div class="list-ignore-gares-buttons">{}</div></details>"#,
        buttons
    )
}

const STYLE: &str = "body{background:#111;color:#eee;font-family:sans-serif}\
.gares{display:flex;flex-wrap:wrap;gap:1em}\
.carte{background:#222;border-radius:8px;padding:1em;min-width:12em}\
.picto{height:2em}.destination{font-weight:bold;margin:.5em 0}\
.horaires{display:flex;justify-content:space-between}.trestant{font-size:1.5em}\
.gare-btn{display:inline-block;margin:.2em;padding:.2em .5em;border:1px solid #666;color:#eee;text-decoration:none}\
.gare-btn--active{background:#a33}";

pub fn render(groups: &[TrainGroup], ignored: &[String], now: DateTime<Utc>) -> String {
    let cards: String = filter_ignored(groups, ignored)
        .into_iter()
        .map(|g| render_card(g, now))
        .collect();

    format!(
        r#"<!DOCTYPE html><html lang="fr"><head><meta charset="utf-8"><meta http-equiv="refresh" content="{}"><title>Prochains trains</title><style>{}</style></head><body><div class="gares">{}</div>{}</body></html>"#,
        REFRESH_SECS,
        STYLE,
        cards,
        render_filters(groups, ignored),
    )
}

pub async fn get_board<F, L>(
    query: web::Query<BoardQuery>,
    ctx: web::Data<ContextData<F, L>>,
) -> HttpResponse
where
    F: StopMonitoringSource + 'static,
    L: LineSource + 'static,
{
    let groups = match ctx.next_trains.next_trains(Utc::now()).await {
        Ok(groups) => {
            ctx.board.store(&groups);
            groups
        }
        Err(e) => {
            log::error!("Board refresh failed, showing last snapshot: {}", e);
            ctx.board.load()
        }
    };

    let ignored = parse_ignore_list(query.ignore.as_deref());

    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(render(&groups, &ignored, Utc::now()))
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;
    use crate::test_utils::{line, visit};
    use crate::trains::group_and_sort;

    fn now() -> DateTime<Utc> {
        "2024-05-01T10:00:00Z".parse().unwrap()
    }

    fn groups(now: DateTime<Utc>) -> Vec<TrainGroup> {
        let c01 = line("C01", "RER C");
        group_and_sort(
            vec![
                visit(&c01, "Paris", now + Duration::minutes(5), ArrivalStatus::Delayed),
                visit(&c01, "Lyon", now + Duration::minutes(2), ArrivalStatus::OnTime),
            ],
            now,
        )
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ignore_list_round_trip() {
        assert!(parse_ignore_list(None).is_empty());
        assert!(parse_ignore_list(Some("")).is_empty());
        assert_eq!(parse_ignore_list(Some("abc12_def34")), ids(&["abc12", "def34"]));
        assert_eq!(parse_ignore_list(Some("abc12__abc12_")), ids(&["abc12"]));

        assert_eq!(format_ignore_list(&[]), None);
        assert_eq!(
            format_ignore_list(&ids(&["abc12", "def34"])).as_deref(),
            Some("abc12_def34")
        );
    }

    #[test]
    fn test_toggle_ignored() {
        let ignored = toggle_ignored(&[], "abc12");
        assert_eq!(ignored, ids(&["abc12"]));

        let ignored = toggle_ignored(&ignored, "def34");
        assert_eq!(ignored, ids(&["abc12", "def34"]));

        let ignored = toggle_ignored(&ignored, "abc12");
        assert_eq!(ignored, ids(&["def34"]));
    }

    #[test]
    fn test_filter_ignored() {
        let now = now();
        let groups = groups(now);
        let paris = groups.iter().find(|g| g.destination_name == "Paris").unwrap();

        let visible = filter_ignored(&groups, &[paris.id.clone()]);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].destination_name, "Lyon");

        let visible = filter_ignored(&groups, &ids(&["zzzzz"]));
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_countdown_minutes() {
        let now = now();
        assert_eq!(countdown_minutes(now + Duration::seconds(59), now), 0);
        assert_eq!(countdown_minutes(now + Duration::seconds(60), now), 1);
        assert_eq!(countdown_minutes(now + Duration::seconds(150), now), 2);
        assert_eq!(countdown_minutes(now - Duration::seconds(1), now), -1);
    }

    #[test]
    fn test_status_color() {
        assert_eq!(status_color(ArrivalStatus::OnTime), "white");
        assert_eq!(status_color(ArrivalStatus::Early), "white");
        assert_eq!(status_color(ArrivalStatus::Delayed), "orange");
        assert_eq!(status_color(ArrivalStatus::Cancelled), "red");
        assert_eq!(status_color(ArrivalStatus::Missed), "red");
        assert_eq!(status_color(ArrivalStatus::NoReport), "gray");
        assert_eq!(status_color(ArrivalStatus::Unknown), "gray");
    }

    #[test]
    fn test_board_href() {
        assert_eq!(board_href(&[]), "/");
        assert_eq!(board_href(&ids(&["abc12", "def34"])), "/?ignoreGares=abc12_def34");
    }

    #[test]
    fn test_render_hides_ignored() {
        let now = now();
        let groups = groups(now);
        let paris = groups.iter().find(|g| g.destination_name == "Paris").unwrap();

        let html = render(&groups, &[paris.id.clone()], now);

        assert!(html.contains(r#"<div class="destination">Lyon</div>"#));
        assert!(!html.contains(r#"<div class="destination">Paris</div>"#));
        // still listed in the filters, marked active, toggling back to no filter
        assert!(html.contains(r#"<a class="gare-btn gare-btn--active" href="/">RER C → Paris</a>"#));
        assert!(html.contains(r#"<meta http-equiv="refresh" content="10">"#));
    }

    #[test]
    fn test_render_slot() {
        let now = now();
        let html = render(&groups(now), &[], now);

        assert!(html.contains(r#"<div class="trestant" style="color: orange">5</div>"#));
        assert!(html.contains(r#"<div class="trestant" style="color: white">2</div>"#));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_snapshot() {
        let snapshot = Snapshot::default();
        assert!(snapshot.load().is_empty());

        let groups = groups(now());
        snapshot.store(&groups);
        assert_eq!(snapshot.load(), groups);
    }
}
