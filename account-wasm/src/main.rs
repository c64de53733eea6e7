use account_client::{DashboardState, UserStats, format_activity_date, format_balance};
use chrono::Local;
use dioxus::prelude::*;

use crate::client::StatsClient;

mod client;
mod error;

const BASE_URL: &str = "http://127.0.0.1:3000";
const DASHBOARD_CSS: Asset = asset!("/assets/dashboard.css");

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Link { rel: "stylesheet", href: DASHBOARD_CSS }
        UserDashboard {}
    }
}

/// Fetches the stats once on mount; the first outcome is final.
#[component]
fn UserDashboard() -> Element {
    let mut state = use_signal(DashboardState::default);

    use_future(move || async move {
        let result = StatsClient::new(BASE_URL).fetch_stats().await;
        state.write().resolve(result);
    });

    let current = state.read().clone();
    match current {
        DashboardState::Loading => rsx! {
            div { "Loading..." }
        },
        DashboardState::Error(message) => rsx! {
            div { class: "error-message", "{message}" }
        },
        DashboardState::Loaded(stats) => rsx! {
            StatsPanel { stats }
        },
    }
}

#[component]
fn StatsPanel(stats: UserStats) -> Element {
    let balance = format_balance(stats.account_balance);

    rsx! {
        div { class: "dashboard-container",
            h1 { "Your Dashboard" }
            div { class: "stats-grid",
                div { class: "stat-card",
                    h3 { "Total Orders" }
                    p { "{stats.total_orders}" }
                }
                div { class: "stat-card",
                    h3 { "Account Balance" }
                    p { "{balance}" }
                }
            }
            div { class: "recent-activity",
                h2 { "Recent Activity" }
                ul {
                    for activity in stats.recent_activity.iter() {
                        li { key: "{activity.id}",
                            span { "{activity.action}" }
                            span { {format_activity_date(activity.timestamp, &Local)} }
                        }
                    }
                }
            }
        }
    }
}
