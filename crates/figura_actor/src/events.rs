/// Composition changes an [`Actor`](crate::Actor) announces to its subscribers.
///
/// Published after the swap has completed, so a subscriber reacting to the
/// event already sees the new composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorEvent {
    /// The clothing set was replaced; names of the new items in group order.
    ClothingChanged { figures: Vec<String> },
    /// The hair slot changed; `None` when hair was removed.
    HairChanged { figure: Option<String> },
}
