//! Live notification stream.

use crate::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use curasphere_core::{StreamItem, Subscription};
use futures_util::stream::{self, Stream};

#[utoipa::path(
    get,
    path = "/notifications/{client_id}/{client_type}",
    params(
        ("client_id" = String, Path, description = "Profile id of the listening client"),
        ("client_type" = String, Path, description = "doctor, nurse or patient")
    ),
    responses(
        (status = 200, description = "Server-sent event stream", body = String, content_type = "text/event-stream")
    )
)]
/// Subscribe to notifications.
///
/// Events are named `message` and carry the notification as JSON. An idle stream sends a
/// `ping` event with empty data at the keep-alive interval. Closing the connection drops the
/// subscription.
#[axum::debug_handler]
pub async fn stream(
    State(state): State<AppState>,
    Path((client_id, client_type)): Path<(String, String)>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.broadcaster.subscribe(&client_id, &client_type);
    tracing::info!(%client_id, %client_type, "notification stream opened");
    Sse::new(events(subscription))
}

fn events(subscription: Subscription) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(subscription, |subscription| async move {
        let event = match subscription.next().await? {
            StreamItem::Event(notification) => {
                Event::default().event("message").json_data(&notification)
            }
            StreamItem::KeepAlive => Ok(Event::default().event("ping").data("")),
        };
        Some((event, subscription))
    })
}
