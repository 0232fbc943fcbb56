//! `define_port_error!`: declares a repository error enum together with one
//! snake_case constructor per variant.
//!
//! Struct-variant constructors take `impl Into<T>` for each field, so
//! adapters can write `UserPersistenceError::query("boom")` or pass the
//! constructor itself as a mapping function.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("Build [`Self::", stringify!($variant), "`].")]
            #[must_use]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            #[doc = concat!("Build [`Self::", stringify!($variant), "`].")]
            #[must_use]
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    define_port_error! {
        pub enum LedgerPortError {
            Connection { message: String } => "ledger connection failed: {message}",
            Rejected { field: String, count: u32 } => "{count} problems with {field}",
            Missing => "no such expense",
        }
    }

    #[rstest]
    fn string_fields_accept_str() {
        let err = LedgerPortError::connection("pool closed");
        assert_eq!(err.to_string(), "ledger connection failed: pool closed");
    }

    #[rstest]
    fn mixed_fields_keep_their_types() {
        let err = LedgerPortError::rejected("amount", 2_u32);
        assert_eq!(
            err,
            LedgerPortError::Rejected {
                field: "amount".to_owned(),
                count: 2,
            }
        );
        assert_eq!(err.to_string(), "2 problems with amount");
    }

    #[rstest]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(LedgerPortError::missing(), LedgerPortError::Missing);
    }

    #[rstest]
    fn constructors_work_as_mapping_functions() {
        let mapped: Vec<_> = ["a", "b"]
            .into_iter()
            .map(LedgerPortError::connection)
            .collect();
        assert_eq!(mapped.len(), 2);
    }
}
