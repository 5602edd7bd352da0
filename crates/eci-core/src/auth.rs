//! Authentication modeled as an ordinary use of the engine: an option-match
//! listener for `WELCOME`/`LOGIN`, followed by a username/password exchange
//! when challenged (spec §4.5), grounded in
//! `original_source/elitecloud_alarm/session.py::_authenticate`.

use std::sync::Arc;

use crate::consumer::FutureConsumer;
use crate::error::{EciError, ExpectedSet};
use crate::request::Request;
use crate::session::{with_auth_timeout, SessionInner};
use crate::transformers::check_string_with_options;

const WELCOME: &str = "WELCOME";
const LOGIN: &str = "LOGIN";
const PASSWORD_PROMPT: &str = "PASSWORD";

pub(crate) async fn authenticate(inner: &Arc<SessionInner>) -> Result<(), EciError> {
    let transformer = check_string_with_options(&[WELCOME, LOGIN], true);
    let (consumer, pending) = FutureConsumer::new(transformer);
    let prompt = with_auth_timeout(&inner.config, inner.listen_and_await(consumer, pending)).await?;

    match prompt.as_str() {
        WELCOME => Ok(()),
        LOGIN => authenticate_credentials(inner).await,
        _ => Err(EciError::InvalidResponse {
            received: prompt,
            expected: ExpectedSet(vec![WELCOME.to_string(), LOGIN.to_string()]),
        }),
    }
}

async fn authenticate_credentials(inner: &Arc<SessionInner>) -> Result<(), EciError> {
    let credentials = inner.credentials.clone().ok_or(EciError::MissingCredentials)?;

    let username_request = Request::single_shot(
        credentials.username,
        check_string_with_options(&[PASSWORD_PROMPT], true),
    );
    with_auth_timeout(&inner.config, inner.send_and_await(username_request)).await?;

    let password_request = Request::single_shot(credentials.password, check_string_with_options(&[WELCOME], true));
    with_auth_timeout(&inner.config, inner.send_and_await(password_request))
        .await
        .map(|_| ())
}
