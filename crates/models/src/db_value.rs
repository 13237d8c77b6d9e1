/// Implements the sea-orm value traits for a string-backed enum so it can be
/// used directly as an entity column. The enum must implement `AsRef<str>`
/// and `FromStr` (both derived through strum).
macro_rules! text_column {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl sea_orm::sea_query::ValueType for $ty {
                fn try_from(v: sea_orm::Value) -> Result<Self, sea_orm::sea_query::ValueTypeErr> {
                    match v {
                        sea_orm::Value::String(Some(s)) => {
                            s.parse().map_err(|_| sea_orm::sea_query::ValueTypeErr)
                        }
                        _ => Err(sea_orm::sea_query::ValueTypeErr),
                    }
                }

                fn type_name() -> String {
                    stringify!($ty).to_string()
                }

                fn array_type() -> sea_orm::sea_query::ArrayType {
                    sea_orm::sea_query::ArrayType::String
                }

                fn column_type() -> sea_orm::sea_query::ColumnType {
                    sea_orm::sea_query::ColumnType::Text
                }
            }

            impl From<$ty> for sea_orm::Value {
                fn from(value: $ty) -> Self {
                    sea_orm::Value::String(Some(Box::new(value.as_ref().to_owned())))
                }
            }

            impl sea_orm::TryGetable for $ty {
                fn try_get_by<I: sea_orm::ColIdx>(
                    res: &sea_orm::QueryResult,
                    index: I,
                ) -> Result<Self, sea_orm::TryGetError> {
                    let val: String = res.try_get_by(index)?;

                    val.parse().map_err(|_| {
                        sea_orm::TryGetError::DbErr(sea_orm::DbErr::Type(format!(
                            "Invalid {} value: {val}",
                            stringify!($ty)
                        )))
                    })
                }
            }

            impl sea_orm::sea_query::Nullable for $ty {
                fn null() -> sea_orm::Value {
                    sea_orm::Value::String(None)
                }
            }
        )+
    };
}

use crate::{
    auth::RoleName,
    status::{
        ContentType, CourseLevel, CourseStatus, EnrollmentStatus, PaymentMethod, PaymentStatus,
        ReviewStatus, UserStatus,
    },
};

text_column!(
    RoleName,
    UserStatus,
    CourseStatus,
    CourseLevel,
    ContentType,
    PaymentMethod,
    PaymentStatus,
    EnrollmentStatus,
    ReviewStatus,
);
