//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block body
///
/// The body must evaluate to `Option<Action>`.
///
/// # Example
///
/// ```rust,ignore
/// use loadstate_core::async_effect;
///
/// async_effect! {
///     let plugins = transport.fetch_all().await.ok()?;
///     Some(PluginsAction::Loaded { plugins })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
