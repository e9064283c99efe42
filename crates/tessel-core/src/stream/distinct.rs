use futures_core::Stream;
use futures_util::{StreamExt, future};

/// Drop items equal to the one emitted just before them.
pub fn distinct_until_changed<S>(stream: S) -> impl Stream<Item = S::Item>
where
    S: Stream,
    S::Item: Clone + PartialEq,
{
    let mut last: Option<S::Item> = None;
    stream.filter_map(move |item| {
        let fresh = last.as_ref() != Some(&item);
        if fresh {
            last = Some(item.clone());
        }
        future::ready(fresh.then_some(item))
    })
}
