//! Deep-link dispatch: sanitize, parse, rate-check, route, record.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, warn};

use crate::domain::entities::{
    AnalyticsEvent, BookingData, DeepLink, DispatchAction, DispatchData, DispatchResult,
    LinkAction, LinkParams, NavigationData, PaymentData, PromotionData, TipData, UNKNOWN_ACTION,
};
use crate::domain::gateways::{PaymentGateway, PaymentResponse, SplitPayment, VenmoPaymentRequest};
use crate::domain::params::{
    ActionParams, BarberParams, BookingParams, NavigationTarget, PaymentParams, ProfileParams,
    PromotionParams, ReviewParams, SUGGESTED_TIP_PERCENTAGES, ShopParams, TipParams,
    to_minor_units,
};
use crate::domain::repositories::AnalyticsRepository;
use crate::error::DeepLinkError;
use crate::infrastructure::rate_limit::{RateLimitConfig, SlidingWindowRateLimiter};
use crate::utils::deep_link_parser::{self, MAX_URL_LENGTH};
use crate::utils::sanitize_input;

pub const DEFAULT_SOURCE: &str = "deeplink";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Payment settings applied to every dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub currency: String,
    /// Upper bound on a single gateway call.
    pub payment_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
        }
    }
}

/// Who opened the link and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    /// Caller identity used for rate-limit keys, e.g. a user id.
    pub identity: Option<String>,
    /// Recorded on the analytics event (`deeplink`, `qr`, `push`...).
    pub source: String,
}

impl DispatchContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_caller(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            identity: None,
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Orchestrates a single link from raw string to [`DispatchResult`].
///
/// The steps run in a fixed order: sanitize, parse, rate-check, route. Every
/// call records exactly one analytics event, whatever the outcome, and makes
/// at most one gateway call. Nothing is retried.
pub struct DeepLinkDispatcher<P, A>
where
    P: PaymentGateway + ?Sized,
    A: AnalyticsRepository + ?Sized,
{
    payment_gateway: Arc<P>,
    analytics: Arc<A>,
    rate_limiter: Arc<SlidingWindowRateLimiter>,
    rate_limit: RateLimitConfig,
    settings: DispatchSettings,
}

impl<P, A> DeepLinkDispatcher<P, A>
where
    P: PaymentGateway + ?Sized,
    A: AnalyticsRepository + ?Sized,
{
    pub fn new(
        payment_gateway: Arc<P>,
        analytics: Arc<A>,
        rate_limiter: Arc<SlidingWindowRateLimiter>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            payment_gateway,
            analytics,
            rate_limiter,
            rate_limit,
            settings: DispatchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn rate_limit(&self) -> &RateLimitConfig {
        &self.rate_limit
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Dispatches one raw link.
    ///
    /// # Errors
    ///
    /// - [`DeepLinkError::Validation`] if the URI fails sanitization or a
    ///   parameter violates its schema
    /// - [`DeepLinkError::Parse`] if the URI does not follow the grammar or is too long
    /// - [`DeepLinkError::RateLimit`] if the caller key is out of quota
    /// - [`DeepLinkError::Handler`] if the payment gateway fails or times out
    pub async fn dispatch(
        &self,
        raw: &str,
        context: &DispatchContext,
    ) -> Result<DispatchResult, DeepLinkError> {
        let span = tracing::info_span!(
            "dispatch",
            source = %context.source,
            action = tracing::field::Empty,
        );

        async {
            let started = Instant::now();

            let link = match Self::parse_link(raw) {
                Ok(link) => link,
                Err(e) => {
                    self.record(raw, None, LinkParams::new(), context, Some(&e), started)
                        .await;
                    return Err(e);
                }
            };

            let action = link.action();
            let params = link.params().clone();
            tracing::Span::current().record("action", action.as_str());

            let outcome = self.admit_and_route(link, context).await;

            self.record(raw, Some(action), params, context, outcome.as_ref().err(), started)
                .await;
            outcome
        }
        .instrument(span)
        .await
    }

    /// received → sanitized → parsed
    fn parse_link(raw: &str) -> Result<DeepLink, DeepLinkError> {
        deep_link_parser::ensure_length(raw)?;

        let sanitized = sanitize_input::uri(raw)?;
        debug!("Link sanitized");

        let link = deep_link_parser::parse(&sanitized)?;
        debug!(action = %link.action(), params = link.params().len(), "Link parsed");

        Ok(link)
    }

    /// parsed → rate-checked → routed
    async fn admit_and_route(
        &self,
        link: DeepLink,
        context: &DispatchContext,
    ) -> Result<DispatchResult, DeepLinkError> {
        let key = self.rate_limit.key_for(&link, context.identity.as_deref());
        let decision =
            self.rate_limiter
                .check(&key, self.rate_limit.max_requests, self.rate_limit.window);

        if !decision.allowed {
            warn!(%key, reset_at = %decision.reset_at, "Rate limit exceeded");
            metrics::counter!("deeplink_rate_limited_total", "action" => link.action().as_str())
                .increment(1);
            return Err(DeepLinkError::rate_limited(
                decision.remaining,
                decision.reset_at,
            ));
        }
        debug!(%key, remaining = decision.remaining, "Rate check passed");

        let outcome = self.route(link).await;

        let release = match outcome {
            Ok(_) => self.rate_limit.skip_successful_requests,
            Err(_) => self.rate_limit.skip_failed_requests,
        };
        if release && let Some(ticket) = decision.ticket {
            self.rate_limiter.release(&key, ticket);
        }

        outcome
    }

    async fn route(&self, link: DeepLink) -> Result<DispatchResult, DeepLinkError> {
        match link.action() {
            LinkAction::Payment => self.handle_payment(link).await,
            LinkAction::Booking => Self::handle_booking(link),
            LinkAction::Tip => self.handle_tip(link).await,
            LinkAction::Shop => Self::navigate::<ShopParams>(link),
            LinkAction::Barber => Self::navigate::<BarberParams>(link),
            LinkAction::Profile => Self::navigate::<ProfileParams>(link),
            LinkAction::Review => Self::navigate::<ReviewParams>(link),
            LinkAction::Promotions => Self::handle_promotion(link),
        }
    }

    async fn handle_payment(&self, link: DeepLink) -> Result<DispatchResult, DeepLinkError> {
        let params = PaymentParams::from_link(&link)?;

        let request = VenmoPaymentRequest {
            amount_minor_units: to_minor_units(params.amount)?,
            currency: self.settings.currency.clone(),
            description: params.payment_description(),
            merchant_note: params.note.clone(),
            private_transaction: params.private.unwrap_or(true),
            split_payment: params
                .split
                .clone()
                .map(|participants| SplitPayment { participants }),
        };

        let payment = self.create_payment(request).await?;

        let data = DispatchData::Payment(PaymentData {
            payment,
            shop: params.shop.clone(),
            barber: params.barber.clone(),
            service: params.service.clone(),
        });

        Ok(DispatchResult::new(
            link,
            DispatchAction::Created,
            data,
            params.to_params(),
        ))
    }

    fn handle_booking(link: DeepLink) -> Result<DispatchResult, DeepLinkError> {
        let params = BookingParams::from_link(&link)?;

        let duration_minutes = params.effective_duration();
        let ends_at = params
            .datetime
            .map(|at| at + chrono::Duration::minutes(i64::from(duration_minutes)));

        let data = DispatchData::Booking(BookingData {
            shop: params.shop.clone(),
            barber: params.barber.clone(),
            service: params.service,
            scheduled_at: params.datetime,
            duration_minutes,
            ends_at,
        });

        Ok(DispatchResult::new(
            link,
            DispatchAction::Book,
            data,
            params.to_params(),
        ))
    }

    async fn handle_tip(&self, link: DeepLink) -> Result<DispatchResult, DeepLinkError> {
        let params = TipParams::from_link(&link)?;

        // a percentage without a subtotal has nothing to apply to
        let Some(amount) = params.resolved_amount().filter(|a| !a.is_zero()) else {
            debug!("Tip amount unresolved, prompting");

            let data = DispatchData::Tip(TipData::Prompt {
                barber: params.barber.clone(),
                appointment: params.appointment.clone(),
                suggested_amount: params.suggested_amount(),
                suggested_percentages: SUGGESTED_TIP_PERCENTAGES.to_vec(),
                percentage: params.percentage,
            });

            return Ok(DispatchResult::new(
                link,
                DispatchAction::Prompt,
                data,
                params.to_params(),
            ));
        };

        let request = VenmoPaymentRequest {
            amount_minor_units: to_minor_units(amount)?,
            currency: self.settings.currency.clone(),
            description: params.payment_description(),
            merchant_note: params
                .appointment
                .as_ref()
                .map(|appointment| format!("Appointment {appointment}")),
            private_transaction: true,
            split_payment: None,
        };

        let payment = self.create_payment(request).await?;

        let data = DispatchData::Tip(TipData::Created {
            payment,
            barber: params.barber.clone(),
            appointment: params.appointment.clone(),
            amount,
            percentage: params.percentage,
        });

        Ok(DispatchResult::new(
            link,
            DispatchAction::Created,
            data,
            params.to_params(),
        ))
    }

    fn navigate<T>(link: DeepLink) -> Result<DispatchResult, DeepLinkError>
    where
        T: ActionParams + NavigationTarget,
    {
        let params = T::from_link(&link)?;
        let sanitized = params.to_params();

        let data = DispatchData::Navigation(NavigationData {
            route: params.route(),
            params: sanitized.clone(),
        });

        Ok(DispatchResult::new(
            link,
            DispatchAction::Navigate,
            data,
            sanitized,
        ))
    }

    fn handle_promotion(link: DeepLink) -> Result<DispatchResult, DeepLinkError> {
        let params = PromotionParams::from_link(&link)?;

        let data = DispatchData::Promotion(PromotionData {
            code: params.code.clone(),
            shop: params.shop.clone(),
        });

        Ok(DispatchResult::new(
            link,
            DispatchAction::Apply,
            data,
            params.to_params(),
        ))
    }

    /// Single gateway attempt bounded by the payment timeout.
    async fn create_payment(
        &self,
        request: VenmoPaymentRequest,
    ) -> Result<PaymentResponse, DeepLinkError> {
        let amount = request.amount_minor_units;
        let timeout = self.settings.payment_timeout;

        match tokio::time::timeout(timeout, self.payment_gateway.create_payment(request)).await {
            Ok(Ok(payment)) => {
                info!(payment_id = %payment.payment_id, amount, "Payment created");
                Ok(payment)
            }
            Ok(Err(e)) => {
                error!(error = %e, amount, "Payment gateway call failed");
                Err(DeepLinkError::handler(
                    e.to_string(),
                    json!({ "amount_minor_units": amount }),
                ))
            }
            Err(_) => {
                error!(timeout_ms = timeout.as_millis() as u64, amount, "Payment gateway timed out");
                Err(DeepLinkError::handler(
                    "Payment gateway timed out",
                    json!({ "timeout_ms": timeout.as_millis() as u64 }),
                ))
            }
        }
    }

    /// routed → handled | failed. Emits the analytics event and metrics.
    async fn record(
        &self,
        url: &str,
        action: Option<LinkAction>,
        params: LinkParams,
        context: &DispatchContext,
        failure: Option<&DeepLinkError>,
        started: Instant,
    ) {
        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        let label = action.map_or(UNKNOWN_ACTION, |a| a.as_str());
        let outcome = failure.map_or("success", DeepLinkError::code);

        metrics::counter!("deeplink_dispatch_total", "action" => label, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("deeplink_dispatch_duration_ms", "action" => label)
            .record(processing_time_ms);

        match failure {
            None => info!(action = label, processing_time_ms, "Link dispatched"),
            Some(e) => warn!(action = label, code = e.code(), error = %e, "Link dispatch failed"),
        }

        let event = AnalyticsEvent {
            url: url.chars().take(MAX_URL_LENGTH).collect(),
            action,
            params,
            timestamp: Utc::now(),
            source: context.source.clone(),
            success: failure.is_none(),
            error: failure.map(ToString::to_string),
            processing_time_ms,
        };

        if let Err(e) = self.analytics.track(event).await {
            warn!(error = %e, "Failed to record analytics event");
        }
    }
}
