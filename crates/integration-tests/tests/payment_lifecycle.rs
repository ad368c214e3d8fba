//! Capture, void, and query flows over an existing order.

use core::str::FromStr;

use rust_decimal::Decimal;

use patinhas_checkout::services::{PaymentOutcome, PaymentService};
use patinhas_core::{
    Address, Amount, CheckoutCustomer, CheckoutRequest, Document, Email, OrderItem, OrderStatus,
    PaymentId, PaymentMethod, PaymentStatus, ProductId,
};
use patinhas_integration_tests::{FakeGateway, MemoryStore};

fn checkout() -> CheckoutRequest {
    CheckoutRequest {
        customer: CheckoutCustomer {
            name: "Maria P Silva".to_string(),
            email: Email::parse("maria@example.com").expect("valid email"),
            document: Document::parse("529.982.247-25").expect("valid CPF"),
            address: Address {
                street: "Rua das Acácias".to_string(),
                number: "123".to_string(),
                complement: None,
                zip_code: "01310-100".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                country: "BRA".to_string(),
            },
        },
        items: vec![OrderItem {
            product_id: ProductId::new(1),
            name: "Arranhador Torre".to_string(),
            unit_price: Amount::new(Decimal::from_str("199.90").expect("valid decimal")),
            quantity: 1,
        }],
        shipping_cost: Amount::ZERO,
        payment_method: PaymentMethod::CreditCard {
            card: patinhas_core::CardData {
                number: "4111111111111111".to_string(),
                holder: "MARIA P SILVA".to_string(),
                expiration: "12/2030".to_string(),
                security_code: "123".to_string(),
                brand: "Visa".to_string(),
            },
            installments: 1,
            // authorize now, capture later
            capture: false,
        },
    }
}

async fn service_with_authorized_order(
    gateway: &FakeGateway,
    store: &MemoryStore,
) -> PaymentService<FakeGateway, MemoryStore> {
    let service = PaymentService::new(gateway.clone(), store.clone());
    gateway.set_sale_status(1); // authorized, not captured
    let outcome = service.process_payment(checkout()).await;
    assert!(outcome.is_success(), "seeding checkout must succeed");
    service
}

#[tokio::test]
async fn capture_confirms_payment_and_moves_order_to_processing() {
    let gateway = FakeGateway::new();
    let store = MemoryStore::new();
    let service = service_with_authorized_order(&gateway, &store).await;

    gateway.set_update_status(2); // payment confirmed
    let outcome = service.capture_payment(&gateway.payment_id(), None).await;

    match outcome {
        PaymentOutcome::Approved(confirmation) => {
            assert_eq!(confirmation.status, PaymentStatus::Confirmed);
        }
        PaymentOutcome::Rejected(rejection) => panic!("capture failed: {}", rejection.error),
    }

    let order = store.last_order().expect("order exists");
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Confirmed);
    assert!(order.cancelled_at.is_none());

    gateway.with_recorded(|recorded| {
        assert_eq!(recorded.captures.len(), 1);
        assert_eq!(recorded.captures[0].1, None);
    });
}

#[tokio::test]
async fn partial_capture_sends_amount_in_cents() {
    let gateway = FakeGateway::new();
    let store = MemoryStore::new();
    let service = service_with_authorized_order(&gateway, &store).await;

    let partial = Amount::new(Decimal::from_str("99.95").expect("valid decimal"));
    service
        .capture_payment(&gateway.payment_id(), Some(partial))
        .await;

    gateway.with_recorded(|recorded| {
        assert_eq!(recorded.captures[0].1, Some(9995));
    });
}

#[tokio::test]
async fn cancel_voids_payment_and_stamps_cancelled_at() {
    let gateway = FakeGateway::new();
    let store = MemoryStore::new();
    let service = service_with_authorized_order(&gateway, &store).await;

    gateway.set_update_status(10); // voided
    let outcome = service.cancel_payment(&gateway.payment_id(), None).await;

    assert!(outcome.is_success());

    let order = store.last_order().expect("order exists");
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.payment_status, PaymentStatus::Cancelled);
    assert!(order.cancelled_at.is_some());

    gateway.with_recorded(|recorded| assert_eq!(recorded.voids.len(), 1));
}

#[tokio::test]
async fn capture_for_unknown_payment_surfaces_persistence_failure() {
    let gateway = FakeGateway::new();
    let store = MemoryStore::new();
    let service = PaymentService::new(gateway.clone(), store.clone());

    let outcome = service
        .capture_payment(&PaymentId::new("no-such-payment"), None)
        .await;

    match outcome {
        PaymentOutcome::Rejected(rejection) => {
            assert_eq!(rejection.error, "failed to persist order");
        }
        PaymentOutcome::Approved(_) => panic!("capture must fail without a stored order"),
    }
}

#[tokio::test]
async fn query_maps_vendor_status_without_touching_the_order() {
    let gateway = FakeGateway::new();
    let store = MemoryStore::new();
    let service = service_with_authorized_order(&gateway, &store).await;

    gateway.set_sale_status(11); // refunded on the gateway side
    let outcome = service.query_payment(&gateway.payment_id()).await;

    match outcome {
        PaymentOutcome::Approved(confirmation) => {
            assert_eq!(confirmation.status, PaymentStatus::Refunded);
            assert!(confirmation.order_id.is_some());
        }
        PaymentOutcome::Rejected(rejection) => panic!("query failed: {}", rejection.error),
    }

    // queries never write
    let order = store.last_order().expect("order exists");
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn query_failure_becomes_failure_envelope() {
    let gateway = FakeGateway::new();
    let store = MemoryStore::new();
    let service = PaymentService::new(gateway.clone(), store.clone());

    gateway.fail_with_status(500);
    let outcome = service.query_payment(&PaymentId::new("any")).await;

    match outcome {
        PaymentOutcome::Rejected(rejection) => {
            assert_eq!(rejection.status_code, Some(500));
        }
        PaymentOutcome::Approved(_) => panic!("query must fail"),
    }
}
