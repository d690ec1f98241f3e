//! The application callback contract.
//!
//! An application receives the request context and a [`StartResponse`]
//! handle. It must call [`StartResponse::start`] before returning its body.
//! Returning an error aborts the current request cycle only.

use crate::http::context::RequestContext;
use crate::http::response::{ResponseBody, StartResponse};

/// Error type an application may fail with.
pub type AppError = Box<dyn std::error::Error + Send + Sync>;

/// A request handler plugged into the server.
pub trait Application: Send + Sync {
    fn call(
        &self,
        context: &RequestContext,
        start_response: &mut StartResponse,
    ) -> Result<ResponseBody, AppError>;
}

impl<A: Application + ?Sized> Application for std::sync::Arc<A> {
    fn call(
        &self,
        context: &RequestContext,
        start_response: &mut StartResponse,
    ) -> Result<ResponseBody, AppError> {
        (**self).call(context, start_response)
    }
}

/// Adapter turning a closure into an [`Application`].
#[derive(Debug, Clone)]
pub struct FnApplication<F>(F);

impl<F> Application for FnApplication<F>
where
    F: Fn(&RequestContext, &mut StartResponse) -> Result<ResponseBody, AppError> + Send + Sync,
{
    fn call(
        &self,
        context: &RequestContext,
        start_response: &mut StartResponse,
    ) -> Result<ResponseBody, AppError> {
        (self.0)(context, start_response)
    }
}

/// Build an application from a closure.
///
/// ```ignore
/// let app = application_fn(|_ctx, start| {
///     start.start("200 OK", [("Content-Type", "text/plain")]);
///     Ok(ResponseBody::once("hi"))
/// });
/// ```
pub fn application_fn<F>(f: F) -> FnApplication<F>
where
    F: Fn(&RequestContext, &mut StartResponse) -> Result<ResponseBody, AppError> + Send + Sync,
{
    FnApplication(f)
}
