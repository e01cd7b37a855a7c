use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "playlists", description = "Curator-authored, signed sequences of artwork items"),
        (name = "channels", description = "Curated references to playlists"),
        (name = "queues", description = "Async write-path queue draining"),
    ),
    info(
        title = "DP-1 Feed Operator API",
        version = "0.1.0",
        description = "Signed-feed operator service for the DP-1 digital-artwork distribution protocol.",
        license(name = "MIT"),
    )
)]
pub struct ApiDoc;
