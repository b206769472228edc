/// The form page is same-origin; other front-ends only need to read results
/// and post corrections.
pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["Content-Type", "Accept", "Origin", "Cache-Control"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
}
