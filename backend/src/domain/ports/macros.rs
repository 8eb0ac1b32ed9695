//! `define_port_error!`: declares a port error enum with `thiserror`
//! messages and snake_case constructors for each variant.

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
    //! Constructor generation for unit, single-field, and multi-field variants.
    define_port_error! {
        pub enum SeatLedgerError {
            Unavailable => "seat ledger unavailable",
            Rejected { reason: String } => "rejected: {reason}",
            Short { requested: u32, available: u32 } => "wanted {requested}, only {available} left",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(SeatLedgerError::unavailable(), SeatLedgerError::Unavailable);
    }

    #[test]
    fn string_fields_accept_str() {
        let err = SeatLedgerError::rejected("closed");
        assert_eq!(err.to_string(), "rejected: closed");
    }

    #[test]
    fn numeric_fields_keep_their_types() {
        let err = SeatLedgerError::short(4_u32, 1_u32);
        assert_eq!(err.to_string(), "wanted 4, only 1 left");
    }
}
