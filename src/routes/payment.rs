use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::ClientSession;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{
    CommissionTransaction, CommissionType, Coupon, EndUser, Payment, PaymentStatus, Plan,
    SubscribeDto, Subscription, UserRef, VerifyPaymentDto,
};
use crate::routes::coupon::find_usable_coupon;
use crate::services::settlement::{self, Quote};
use crate::services::PaymentGateway;
use crate::utils::{ApiError, ApiResponse, Created};

struct SettlementOutcome {
    payment_id: ObjectId,
    transaction_id: String,
    subscription_id: Option<ObjectId>,
    expires_at: Option<DateTime>,
}

/// The all-or-nothing half of subscribe: payment, commission,
/// completion, ledger swap and plan pointer all ride one session
/// transaction. String errors keep the rollback path uniform; the
/// caller wraps them into the 500 processing response.
async fn run_settlement(
    db: &DbConn,
    session: &mut ClientSession,
    user: &UserRef,
    plan: &Plan,
    coupon: Option<&Coupon>,
    quote: &Quote,
    payment_method: &str,
) -> Result<SettlementOutcome, String> {
    let now = DateTime::now();

    let payment = Payment {
        id: None,
        user_id: user.id,
        user_type: user.kind,
        plan_id: plan.id.ok_or("plan missing ID")?,
        coupon_id: coupon.and_then(|c| c.id),
        original_amount: quote.original,
        discount_amount: quote.discount,
        amount: quote.total,
        payment_method: payment_method.to_string(),
        transaction_id: None,
        status: PaymentStatus::Pending,
        paid_at: None,
        created_at: now,
        updated_at: now,
    };
    let payment_id = db
        .collection::<Payment>("payments")
        .insert_one_with_session(&payment, None, session)
        .await
        .map_err(|e| e.to_string())?
        .inserted_id
        .as_object_id()
        .ok_or("payment insert returned no ID")?;

    // Commission goes to whoever created the coupon, not the approver.
    if let Some(coupon) = coupon {
        let commission = CommissionTransaction {
            id: None,
            staff_id: coupon.created_by,
            payment_id: Some(payment_id),
            amount_earned: settlement::commission(
                quote.total,
                crate::config::Config::commission_rate(),
            ),
            commission_type: CommissionType::CouponBased,
            created_at: now,
        };
        db.collection::<CommissionTransaction>("commission_transactions")
            .insert_one_with_session(&commission, None, session)
            .await
            .map_err(|e| e.to_string())?;
    }

    let transaction_id = PaymentGateway::transaction_id();
    db.collection::<Payment>("payments")
        .update_one_with_session(
            doc! { "_id": payment_id },
            doc! { "$set": {
                "status": "completed",
                "transaction_id": &transaction_id,
                "paid_at": DateTime::now(),
                "updated_at": DateTime::now(),
            }},
            None,
            session,
        )
        .await
        .map_err(|e| e.to_string())?;

    // Single-active rule: the new subscription supersedes whatever was
    // running.
    db.collection::<Subscription>("subscriptions")
        .update_many_with_session(
            doc! {
                "owner_id": user.id,
                "owner_kind": user.kind.as_str(),
                "status": "active",
            },
            doc! { "$set": { "status": "cancelled", "updated_at": DateTime::now() } },
            None,
            session,
        )
        .await
        .map_err(|e| e.to_string())?;

    let subscription = Subscription::from_plan(user, plan, Some(payment_id), now);
    let subscription_id = db
        .collection::<Subscription>("subscriptions")
        .insert_one_with_session(&subscription, None, session)
        .await
        .map_err(|e| e.to_string())?
        .inserted_id
        .as_object_id();

    db.collection::<EndUser>(user.kind.collection())
        .update_one_with_session(
            doc! { "_id": user.id },
            doc! { "$set": {
                "plan_id": plan.id,
                "subscription_id": subscription_id,
                "updated_at": DateTime::now(),
            }},
            None,
            session,
        )
        .await
        .map_err(|e| e.to_string())?;

    Ok(SettlementOutcome {
        payment_id,
        transaction_id,
        subscription_id,
        expires_at: subscription.expires_at,
    })
}

#[openapi(tag = "Payments")]
#[post("/payments/subscribe", data = "<dto>")]
pub async fn subscribe(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<SubscribeDto>,
) -> Result<Created<serde_json::Value>, ApiError> {
    let plan_oid = ObjectId::parse_str(&dto.plan_id)
        .map_err(|_| ApiError::bad_request("Invalid plan ID"))?;
    let plan = db
        .collection::<Plan>("plans")
        .find_one(doc! { "_id": plan_oid }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Plan not found"))?;
    if plan.plan_for != auth.user.kind {
        return Err(ApiError::bad_request("Plan is not available for this account type"));
    }

    // A code that matches nothing usable simply means full price.
    let coupon = match &dto.coupon_code {
        Some(code) => find_usable_coupon(db, code, auth.user.kind).await?,
        None => None,
    };

    let quote = settlement::quote(plan.price, coupon.as_ref().map(|c| c.discount_percentage));
    let payment_method = dto.payment_method.as_deref().unwrap_or("gateway");

    let mut session = db
        .client
        .start_session(None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Session error: {}", e)))?;
    session
        .start_transaction(None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Transaction error: {}", e)))?;

    let outcome = match run_settlement(
        db,
        &mut session,
        &auth.user,
        &plan,
        coupon.as_ref(),
        &quote,
        payment_method,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(cause) => {
            let _ = session.abort_transaction().await;
            error!("Settlement rolled back: {}", cause);
            return Err(ApiError::internal_error(format!(
                "Subscription processing failed: {}",
                cause
            )));
        }
    };

    if let Err(e) = session.commit_transaction().await {
        error!("Settlement commit failed: {}", e);
        return Err(ApiError::internal_error(format!(
            "Subscription processing failed: {}",
            e
        )));
    }

    Ok(Created(ApiResponse::success_with_message(
        "Subscription activated".to_string(),
        serde_json::json!({
            "payment": {
                "id": outcome.payment_id.to_hex(),
                "transaction_id": outcome.transaction_id,
                "status": "completed",
                "original_amount": settlement::money(quote.original),
                "discount_amount": settlement::money(quote.discount),
                "amount": settlement::money(quote.total),
                "coupon_code": coupon.as_ref().map(|c| c.code.clone()),
            },
            "subscription": {
                "id": outcome.subscription_id.map(|id| id.to_hex()),
                "plan_id": plan.id.map(|id| id.to_hex()),
                "plan_name": plan.name,
                "expires_at": outcome.expires_at,
            },
        }),
    )))
}

/// Re-confirmation hook for client-driven flows. Completed payments are
/// acknowledged as-is; a pending one is completed with the supplied
/// transaction id and the caller's plan pointer refreshed.
#[openapi(tag = "Payments")]
#[post("/payments/verify", data = "<dto>")]
pub async fn verify_payment(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<VerifyPaymentDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let payment_oid = ObjectId::parse_str(&dto.payment_id)
        .map_err(|_| ApiError::bad_request("Invalid payment ID"))?;

    let payment = db
        .collection::<Payment>("payments")
        .find_one(doc! { "_id": payment_oid }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Payment not found"))?;

    if payment.user_id != auth.user.id || payment.user_type != auth.user.kind {
        return Err(ApiError::forbidden("Payment belongs to a different account"));
    }

    match payment.status {
        PaymentStatus::Completed => {
            return Ok(Json(ApiResponse::success(serde_json::json!({
                "payment_id": &dto.payment_id,
                "status": "completed",
                "transaction_id": payment.transaction_id,
            }))));
        }
        PaymentStatus::Failed => {
            return Err(ApiError::bad_request("Payment has already failed"));
        }
        PaymentStatus::Pending => {}
    }

    db.collection::<Payment>("payments")
        .update_one(
            doc! { "_id": payment_oid, "status": "pending" },
            doc! { "$set": {
                "status": "completed",
                "transaction_id": &dto.transaction_id,
                "paid_at": DateTime::now(),
                "updated_at": DateTime::now(),
            }},
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update payment: {}", e)))?;

    db.collection::<EndUser>(auth.user.kind.collection())
        .update_one(
            doc! { "_id": auth.user.id },
            doc! { "$set": { "plan_id": payment.plan_id, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update account: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "payment_id": &dto.payment_id,
        "status": "completed",
        "transaction_id": &dto.transaction_id,
    }))))
}
