/// Fallible conversion that has to await I/O, such as loading a document
/// from a path.
pub trait AsyncTryFrom<T>: Sized {
    type Error;

    async fn async_try_from(value: T) -> Result<Self, Self::Error>;
}

/// Counterpart of [`AsyncTryFrom`], implemented for every source type.
pub trait AsyncTryInto<T> {
    type Error;

    async fn async_try_into(self) -> Result<T, Self::Error>;
}

impl<T, U> AsyncTryInto<U> for T
where
    U: AsyncTryFrom<T>,
{
    type Error = U::Error;

    async fn async_try_into(self) -> Result<U, Self::Error> {
        U::async_try_from(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Depth(usize);

    impl<'a> AsyncTryFrom<&'a str> for Depth {
        type Error = String;

        async fn async_try_from(value: &'a str) -> Result<Self, Self::Error> {
            if value.is_empty() {
                return Err("empty".to_string());
            }
            Ok(Depth(value.split('/').count()))
        }
    }

    #[compio::test]
    async fn try_from_converts() {
        let depth = Depth::async_try_from("a/b/c").await.unwrap();
        assert_eq!(depth.0, 3);
    }

    #[compio::test]
    async fn try_into_forwards_errors() {
        let result: Result<Depth, _> = "".async_try_into().await;
        assert_eq!(result.err().as_deref(), Some("empty"));
    }
}
