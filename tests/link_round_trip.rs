mod common;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use freshcuts_deeplinks::application::services::DispatchContext;
use freshcuts_deeplinks::domain::entities::{DispatchAction, LinkAction};
use freshcuts_deeplinks::domain::params::{
    ActionParams, BarberParams, BookingParams, PaymentParams, ProfileParams, PromotionParams,
    ReviewParams, ServiceType, ShopParams, TipParams,
};
use freshcuts_deeplinks::utils::{deep_link_parser, link_generator};

fn reparse<P: ActionParams>(uri: &str) -> P {
    let link = deep_link_parser::parse(uri).unwrap();
    assert_eq!(link.action(), P::ACTION);
    P::from_link(&link).unwrap()
}

#[test]
fn test_payment_round_trip() {
    let params = PaymentParams {
        amount: Decimal::new(4550, 2),
        shop: Some("nyc_01".into()),
        barber: Some("jb".into()),
        service: Some("Fade & Beard".into()),
        note: Some("Birthday cut".into()),
        private: Some(false),
        split: Some(vec!["alice".into(), "bob".into()]),
        ..PaymentParams::default()
    };

    let uri = link_generator::payment(&params).unwrap();
    assert!(uri.starts_with("freshcuts://payment?amount=45.5&"));

    assert_eq!(reparse::<PaymentParams>(&uri), params);
}

#[test]
fn test_booking_round_trip() {
    let params = BookingParams {
        shop: Some("nyc_01".into()),
        barber: Some("jb".into()),
        service: Some(ServiceType::BeardTrim),
        datetime: Some(Utc.with_ymd_and_hms(2026, 10, 18, 14, 30, 0).unwrap()),
        duration: Some(60),
    };

    let uri = link_generator::booking(&params).unwrap();
    assert_eq!(reparse::<BookingParams>(&uri), params);
}

#[test]
fn test_tip_round_trip() {
    let params = TipParams {
        barber: Some("jb".into()),
        appointment: Some("apt_9".into()),
        percentage: Some(18),
        subtotal: Some(Decimal::new(40, 0)),
        ..TipParams::default()
    };

    let uri = link_generator::tip(&params).unwrap();
    assert_eq!(reparse::<TipParams>(&uri), params);
}

#[test]
fn test_navigation_round_trips() {
    let shop = ShopParams {
        shop: "nyc_01".into(),
        section: Some("services".into()),
    };
    assert_eq!(reparse::<ShopParams>(&link_generator::shop(&shop).unwrap()), shop);

    let barber = BarberParams {
        barber: "jb".into(),
        shop: Some("nyc_01".into()),
    };
    assert_eq!(reparse::<BarberParams>(&link_generator::barber(&barber).unwrap()), barber);

    let profile = ProfileParams::default();
    let uri = link_generator::profile(&profile).unwrap();
    assert_eq!(uri, "freshcuts://profile");
    assert_eq!(reparse::<ProfileParams>(&uri), profile);

    let review = ReviewParams {
        shop: Some("nyc_01".into()),
        rating: Some(4),
        ..ReviewParams::default()
    };
    assert_eq!(reparse::<ReviewParams>(&link_generator::review(&review).unwrap()), review);
}

#[test]
fn test_promotion_round_trip() {
    let params = PromotionParams {
        code: "FRESH20".into(),
        shop: None,
    };

    let uri = link_generator::promotions(&params).unwrap();
    assert_eq!(uri, "freshcuts://promotions?code=FRESH20");
    assert_eq!(reparse::<PromotionParams>(&uri), params);
}

#[test]
fn test_generator_rejects_invalid_params() {
    let err = link_generator::payment(&PaymentParams::new(Decimal::ZERO)).unwrap_err();
    assert_eq!(err.code(), "validation_error");

    let booking = BookingParams {
        duration: Some(0),
        ..BookingParams::default()
    };
    assert!(link_generator::booking(&booking).is_err());
}

#[test]
fn test_non_canonical_input_round_trips_once_normalized() {
    let shop = ShopParams {
        shop: "nyc 01".into(),
        section: None,
    };
    assert_eq!(link_generator::shop(&shop).unwrap_err().code(), "validation_error");

    let shop = shop.canonical().unwrap();
    assert_eq!(shop.shop, "nyc01");
    assert_eq!(reparse::<ShopParams>(&link_generator::shop(&shop).unwrap()), shop);

    let mut payment = PaymentParams::new(Decimal::new(2000, 2));
    payment.description = Some("<b>Cut</b>".into());
    payment.service = Some("  Fade   &  Beard ".into());
    assert!(link_generator::payment(&payment).is_err());

    let payment = payment.canonical().unwrap();
    assert_eq!(payment.description.as_deref(), Some("Cut"));
    assert_eq!(payment.service.as_deref(), Some("Fade & Beard"));
    assert_eq!(reparse::<PaymentParams>(&link_generator::payment(&payment).unwrap()), payment);
}

#[tokio::test]
async fn test_generated_links_dispatch() {
    let engine = common::create_test_engine(common::generous_limit());
    let context = DispatchContext::anonymous();

    let links = [
        (
            link_generator::payment(&PaymentParams::new(Decimal::new(45, 0))).unwrap(),
            LinkAction::Payment,
            DispatchAction::Created,
        ),
        (
            link_generator::booking(&BookingParams::default()).unwrap(),
            LinkAction::Booking,
            DispatchAction::Book,
        ),
        (
            link_generator::tip(&TipParams::default()).unwrap(),
            LinkAction::Tip,
            DispatchAction::Prompt,
        ),
        (
            link_generator::profile(&ProfileParams::default()).unwrap(),
            LinkAction::Profile,
            DispatchAction::Navigate,
        ),
    ];

    for (uri, result_type, action) in links {
        let result = engine.dispatcher.dispatch(&uri, &context).await.unwrap();
        assert_eq!(result.result_type, result_type, "{uri}");
        assert_eq!(result.action, action, "{uri}");
    }

    assert_eq!(engine.gateway.requests().await.len(), 1);
    assert_eq!(engine.analytics.len().await, 4);
}
