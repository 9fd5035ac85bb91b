use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use laundry_engine::{
    db_types::{OrderStatus, PaymentStatus},
    lms_api::order_objects::OrderQueryFilter,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Order search parameters as they arrive in a query string. Status lists are comma-separated,
/// e.g. `?status=Received,InProgress&payment_status=Unpaid`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderSearchParams {
    pub client_id: Option<i64>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn parse_list<T>(value: Option<String>) -> Result<Option<Vec<T>>, ServerError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(value) = value else {
        return Ok(None);
    };
    let list = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(|e| ServerError::ValidationError(e.to_string())))
        .collect::<Result<Vec<T>, _>>()?;
    Ok(Some(list).filter(|l| !l.is_empty()))
}

impl TryFrom<OrderSearchParams> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(params: OrderSearchParams) -> Result<Self, Self::Error> {
        Ok(OrderQueryFilter {
            client_id: params.client_id,
            status: parse_list::<OrderStatus>(params.status)?,
            payment_status: parse_list::<PaymentStatus>(params.payment_status)?,
            since: params.since,
            until: params.until,
            search: params.search,
            limit: params.limit,
            offset: params.offset,
        })
    }
}

/// `GET /mpesa/stk/{checkout_id}?refresh=true` asks M-Pesa for the latest result before answering.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StkStatusParams {
    #[serde(default)]
    pub refresh: bool,
}
