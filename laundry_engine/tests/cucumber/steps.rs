use chrono::Duration;
use cucumber::{then, when};
use laundry_engine::{
    db_types::{
        Money,
        NewMpesaTransaction,
        PaymentStatus,
        PhoneNumber,
        StkResolution,
        StkStatus,
        TransactionSource,
        TransactionStatus,
    },
    lms_api::{
        order_objects::{Cart, CartItem, NewOrderRequest},
        payment_objects::InitiatePaymentRequest,
    },
};

use crate::cucumber::LaundryWorld;

//--------------------------------------        Orders         --------------------------------------------------------

#[when(expr = "'{word}' orders {int} duvet(s)")]
async fn order_duvets(world: &mut LaundryWorld, name: String, count: i64) {
    let system = world.system();
    let client_id = system.client_id(&name);
    let cart = Cart::new(vec![CartItem::new(system.catalog().duvet.id, count as f64)]);
    let request = NewOrderRequest::new(client_id, cart);
    let receipt = system.orders.create_order(request).await.expect("Error creating order");
    system.order_ids.push(receipt.order.id);
}

#[then(expr = "order {int} has payment status {word}")]
async fn check_payment_status(world: &mut LaundryWorld, n: usize, status: String) {
    let expected = status.parse::<PaymentStatus>().expect("Not a payment status");
    let order = world.system().order(n).await;
    assert_eq!(order.payment_status, expected, "Order {} payment status", order.order_number);
}

#[then(expr = "order {int} has a balance of {int} KES")]
async fn check_balance(world: &mut LaundryWorld, n: usize, shillings: i64) {
    let order = world.system().order(n).await;
    assert_eq!(order.balance(), Money::from_shillings(shillings), "Order {} balance", order.order_number);
}

//--------------------------------------       STK push        --------------------------------------------------------

#[when(expr = "the cashier sends a payment prompt for order {int}")]
async fn send_prompt(world: &mut LaundryWorld, n: usize) {
    let system = world.system();
    let id = system.order_id(n);
    let push =
        system.payments.initiate_stk_push(InitiatePaymentRequest::for_order(id)).await.expect("Error sending prompt");
    system.prompts.insert(id, push.request.checkout_request_id);
}

#[when(expr = "M-Pesa confirms the prompt for order {int} with receipt {word}")]
async fn confirm_prompt(world: &mut LaundryWorld, n: usize, receipt: String) {
    let system = world.system();
    let checkout_id = system.prompt(n);
    let request = system.payments.fetch_stk_request(&checkout_id).await.unwrap().expect("Prompt does not exist");
    let resolution = StkResolution::new(0, "The service request is processed successfully.")
        .with_receipt(receipt)
        .with_amount(request.amount)
        .with_phone(request.phone);
    system.payments.handle_stk_callback(&checkout_id, resolution).await.expect("Error handling callback");
}

#[when(expr = "M-Pesa reports result code {int} for the prompt for order {int}")]
async fn fail_prompt(world: &mut LaundryWorld, code: i64, n: usize) {
    let system = world.system();
    let checkout_id = system.prompt(n);
    let resolution = StkResolution::new(code, "The prompt was not completed");
    system.payments.handle_stk_callback(&checkout_id, resolution).await.expect("Error handling callback");
}

#[when("the stale payment prompts expire")]
async fn expire_prompts(world: &mut LaundryWorld) {
    let system = world.system();
    system.payments.expire_stale_stk_requests(Duration::zero()).await.expect("Error expiring prompts");
}

#[then(expr = "the prompt for order {int} is {word}")]
async fn check_prompt(world: &mut LaundryWorld, n: usize, status: String) {
    let expected = status.parse::<StkStatus>().expect("Not an STK status");
    let system = world.system();
    let checkout_id = system.prompt(n);
    let request = system.payments.fetch_stk_request(&checkout_id).await.unwrap().expect("Prompt does not exist");
    assert_eq!(request.status, expected);
}

//--------------------------------------    Reconciliation     --------------------------------------------------------

#[when(expr = "a paybill payment {word} of {int} KES arrives with the number of order {int}")]
async fn paybill_with_reference(world: &mut LaundryWorld, receipt: String, shillings: i64, n: usize) {
    let system = world.system();
    let order = system.order(n).await;
    let tx = NewMpesaTransaction::new(receipt, Money::from_shillings(shillings), TransactionSource::C2b)
        .with_account_reference(order.order_number);
    system.payments.process_c2b_transaction(tx).await.expect("Error processing payment");
}

#[when(expr = "a paybill payment {word} of {int} KES arrives from {word}")]
async fn paybill_from_phone(world: &mut LaundryWorld, receipt: String, shillings: i64, phone: String) {
    let phone = PhoneNumber::parse(&phone).expect("Invalid phone number");
    let tx = NewMpesaTransaction::new(receipt, Money::from_shillings(shillings), TransactionSource::C2b)
        .with_phone(phone);
    world.system().payments.process_c2b_transaction(tx).await.expect("Error processing payment");
}

#[when(expr = "transaction {word} is connected to order {int}")]
async fn connect(world: &mut LaundryWorld, receipt: String, n: usize) {
    let system = world.system();
    let tx = system.transaction(&receipt).await;
    let order_id = system.order_id(n);
    system.payments.connect_transaction(tx.id, order_id).await.expect("Error connecting transaction");
}

#[when("the unmatched transactions are reconciled")]
async fn reconcile_all(world: &mut LaundryWorld) {
    world.system().payments.reconcile_unmatched().await.expect("Error reconciling transactions");
}

#[then(expr = "transaction {word} is {word}")]
async fn check_transaction(world: &mut LaundryWorld, receipt: String, status: String) {
    let expected = status.parse::<TransactionStatus>().expect("Not a transaction status");
    let tx = world.system().transaction(&receipt).await;
    assert_eq!(tx.status, expected, "Transaction {receipt}");
}

#[then(expr = "transaction {word} has {int} candidate order(s)")]
async fn check_candidates(world: &mut LaundryWorld, receipt: String, count: usize) {
    let system = world.system();
    let tx = system.transaction(&receipt).await;
    let candidates = system.payments.candidates_for_transaction(tx.id).await.expect("Error fetching candidates");
    assert_eq!(candidates.len(), count);
}
