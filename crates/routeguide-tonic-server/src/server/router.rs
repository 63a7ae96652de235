use crate::server::service::handler::RouteGuideService;
use futures::Stream;
use routeguide_tonic_core::proto::{FILE_DESCRIPTOR_SET, route_guide_server::RouteGuideServer};
use tokio::io::{AsyncRead, AsyncWrite};
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Serves the route guide on `incoming` until `signal` resolves.
///
/// Alongside `RouteGuide` the server exposes the standard gRPC health and
/// reflection services and accepts gRPC-web over HTTP/1.1. Once `signal`
/// fires, health flips to `NOT_SERVING`, new calls are refused, and in-flight
/// calls get the configured drain window before they are cancelled.
///
/// # Errors
///
/// Returns an error if reflection cannot be built or the transport fails.
pub async fn serve_with_incoming<I, IO, IE, F>(
    service: RouteGuideService,
    incoming: I,
    signal: F,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
    F: Future<Output = ()>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<RouteGuideServer<RouteGuideService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let draining = service.clone();
    let shutdown = async move {
        signal.await;
        #[cfg(feature = "tracing")]
        tracing::info!("Shutdown signal received, terminating gracefully...");

        health_reporter
            .set_not_serving::<RouteGuideServer<RouteGuideService>>()
            .await;
        draining.shutdown().await;
    };

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_route_guide_service(service))
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;

    #[cfg(feature = "tracing")]
    tracing::info!("Service shut down successfully");
    Ok(())
}

fn build_route_guide_service(service: RouteGuideService) -> RouteGuideServer<RouteGuideService> {
    RouteGuideServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
