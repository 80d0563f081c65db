use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_stores_and_drivers::Migration),
            Box::new(m20260101_000002_create_orders_tables::Migration),
            Box::new(m20260101_000003_create_delivery_tables::Migration),
            Box::new(m20260101_000004_create_payment_approvals_table::Migration),
        ]
    }
}

mod m20260101_000001_create_stores_and_drivers {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_stores_and_drivers"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stores::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Stores::Name).string().not_null())
                        .col(ColumnDef::new(Stores::Slug).string_len(64).not_null())
                        .col(
                            ColumnDef::new(Stores::DeliveryFee)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Stores::OrderSequence)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Stores::SubscriptionPlan).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Stores::SubscriptionExpiresAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Stores::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Stores::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Stores::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stores_slug")
                        .table(Stores::Table)
                        .col(Stores::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Drivers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Drivers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Drivers::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Drivers::Name).string().not_null())
                        .col(ColumnDef::new(Drivers::Phone).string_len(32).null())
                        .col(
                            ColumnDef::new(Drivers::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Drivers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_drivers_store_id")
                                .from(Drivers::Table, Drivers::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_drivers_store_id")
                        .table(Drivers::Table)
                        .col(Drivers::StoreId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Drivers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Stores {
        Table,
        Id,
        Name,
        Slug,
        DeliveryFee,
        OrderSequence,
        SubscriptionPlan,
        SubscriptionExpiresAt,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Drivers {
        Table,
        Id,
        StoreId,
        Name,
        Phone,
        Active,
        CreatedAt,
    }
}

mod m20260101_000002_create_orders_tables {

    use super::m20260101_000001_create_stores_and_drivers::Stores;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).integer().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(ColumnDef::new(Orders::DeliveryType).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::DeliveryAddress).string().null())
                        .col(ColumnDef::new(Orders::Notes).string().null())
                        .col(ColumnDef::new(Orders::Subtotal).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Orders::DeliveryFee).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Orders::Discount).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Orders::Total).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Orders::CancelReason).string().null())
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_store_id")
                                .from(Orders::Table, Orders::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_store_order_number")
                        .table(Orders::Table)
                        .col(Orders::StoreId)
                        .col(Orders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_store_status")
                        .table(Orders::Table)
                        .col(Orders::StoreId)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(OrderItems::TotalPrice).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(OrderItems::Notes).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderStatusHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderStatusHistory::Action).string_len(32).not_null())
                        .col(ColumnDef::new(OrderStatusHistory::FromStatus).string_len(32).null())
                        .col(ColumnDef::new(OrderStatusHistory::ToStatus).string_len(32).not_null())
                        .col(ColumnDef::new(OrderStatusHistory::ActorRole).string_len(16).not_null())
                        .col(ColumnDef::new(OrderStatusHistory::ActorId).uuid().not_null())
                        .col(ColumnDef::new(OrderStatusHistory::Note).string().null())
                        .col(
                            ColumnDef::new(OrderStatusHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_status_history_order_id")
                                .from(OrderStatusHistory::Table, OrderStatusHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_status_history_order_id")
                        .table(OrderStatusHistory::Table)
                        .col(OrderStatusHistory::OrderId)
                        .col(OrderStatusHistory::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        StoreId,
        OrderNumber,
        CustomerId,
        CustomerName,
        DeliveryType,
        Status,
        DeliveryAddress,
        Notes,
        Subtotal,
        DeliveryFee,
        Discount,
        Total,
        CancelReason,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductName,
        Quantity,
        UnitPrice,
        TotalPrice,
        Notes,
    }

    #[derive(DeriveIden)]
    enum OrderStatusHistory {
        Table,
        Id,
        OrderId,
        Action,
        FromStatus,
        ToStatus,
        ActorRole,
        ActorId,
        Note,
        CreatedAt,
    }
}

mod m20260101_000003_create_delivery_tables {

    use super::m20260101_000001_create_stores_and_drivers::Drivers;
    use super::m20260101_000002_create_orders_tables::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_delivery_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryAssignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryAssignments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryAssignments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(DeliveryAssignments::DriverId).uuid().not_null())
                        .col(ColumnDef::new(DeliveryAssignments::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(DeliveryAssignments::AssignedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryAssignments::AcceptedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryAssignments::PickedUpAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryAssignments::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryAssignments::RejectedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryAssignments::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(DeliveryAssignments::RejectionReason).string().null())
                        .col(
                            ColumnDef::new(DeliveryAssignments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_delivery_assignments_order_id")
                                .from(DeliveryAssignments::Table, DeliveryAssignments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_delivery_assignments_driver_id")
                                .from(DeliveryAssignments::Table, DeliveryAssignments::DriverId)
                                .to(Drivers::Table, Drivers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_assignments_order_id")
                        .table(DeliveryAssignments::Table)
                        .col(DeliveryAssignments::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_assignments_driver_status")
                        .table(DeliveryAssignments::Table)
                        .col(DeliveryAssignments::DriverId)
                        .col(DeliveryAssignments::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DriverEarnings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(DriverEarnings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(DriverEarnings::OrderId).uuid().not_null())
                        .col(ColumnDef::new(DriverEarnings::AssignmentId).uuid().not_null())
                        .col(ColumnDef::new(DriverEarnings::DriverId).uuid().not_null())
                        .col(ColumnDef::new(DriverEarnings::StoreId).uuid().not_null())
                        .col(ColumnDef::new(DriverEarnings::Amount).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(DriverEarnings::PaymentStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DriverEarnings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DriverEarnings::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_driver_earnings_order_id")
                                .from(DriverEarnings::Table, DriverEarnings::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_driver_earnings_assignment_id")
                                .from(DriverEarnings::Table, DriverEarnings::AssignmentId)
                                .to(DeliveryAssignments::Table, DeliveryAssignments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One credit per order, whatever retries happen upstream.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_driver_earnings_order_id")
                        .table(DriverEarnings::Table)
                        .col(DriverEarnings::OrderId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_driver_earnings_driver_status")
                        .table(DriverEarnings::Table)
                        .col(DriverEarnings::DriverId)
                        .col(DriverEarnings::PaymentStatus)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DriverEarnings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DeliveryAssignments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DeliveryAssignments {
        Table,
        Id,
        OrderId,
        DriverId,
        Status,
        AssignedAt,
        AcceptedAt,
        PickedUpAt,
        DeliveredAt,
        RejectedAt,
        CancelledAt,
        RejectionReason,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DriverEarnings {
        Table,
        Id,
        OrderId,
        AssignmentId,
        DriverId,
        StoreId,
        Amount,
        PaymentStatus,
        CreatedAt,
        PaidAt,
    }
}

mod m20260101_000004_create_payment_approvals_table {

    use super::m20260101_000001_create_stores_and_drivers::Stores;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_payment_approvals_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentApprovals::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentApprovals::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentApprovals::StoreId).uuid().not_null())
                        .col(ColumnDef::new(PaymentApprovals::Plan).string_len(32).not_null())
                        .col(ColumnDef::new(PaymentApprovals::Months).integer().not_null())
                        .col(ColumnDef::new(PaymentApprovals::Amount).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(PaymentApprovals::Status).string_len(16).not_null())
                        .col(ColumnDef::new(PaymentApprovals::SubmittedBy).uuid().not_null())
                        .col(ColumnDef::new(PaymentApprovals::ReviewNote).string().null())
                        .col(ColumnDef::new(PaymentApprovals::ReviewedBy).uuid().null())
                        .col(
                            ColumnDef::new(PaymentApprovals::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentApprovals::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_approvals_store_id")
                                .from(PaymentApprovals::Table, PaymentApprovals::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_approvals_status")
                        .table(PaymentApprovals::Table)
                        .col(PaymentApprovals::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentApprovals::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PaymentApprovals {
        Table,
        Id,
        StoreId,
        Plan,
        Months,
        Amount,
        Status,
        SubmittedBy,
        ReviewNote,
        ReviewedBy,
        ReviewedAt,
        CreatedAt,
    }
}
