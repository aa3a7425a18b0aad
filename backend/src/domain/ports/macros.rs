//! `define_port_error!` builds a driven port's error enum together with one
//! snake_case constructor per variant, so adapters can write
//! `SuggestionRepositoryError::query(err.to_string())`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
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
    define_port_error! {
        pub enum LedgerStoreError {
            Offline => "ledger store offline",
            Query { message: String } => "ledger query failed: {message}",
            Stale { expected: u32 } => "stale revision {expected}",
            Mixed { message: String, expected: u32 } => "{message} at revision {expected}",
        }
    }

    #[test]
    fn unit_variants_get_snake_case_constructors() {
        assert_eq!(LedgerStoreError::offline().to_string(), "ledger store offline");
    }

    #[test]
    fn string_fields_accept_str() {
        let err = LedgerStoreError::query("timeout");
        assert_eq!(err.to_string(), "ledger query failed: timeout");
    }

    #[test]
    fn numeric_fields_keep_their_type() {
        assert_eq!(LedgerStoreError::stale(7_u32), LedgerStoreError::Stale { expected: 7 });
    }

    #[test]
    fn mixed_fields_are_positional() {
        let err = LedgerStoreError::mixed("write rejected", 3_u32);
        assert_eq!(err.to_string(), "write rejected at revision 3");
    }
}
